//! Session management for PTP
//!
//! A session represents a logical connection to a device and tracks:
//! - Session ID (chosen by the initiator in OpenSession)
//! - Transaction counter (increments per transaction)
//! - Open/closed state
//!
//! The session is plain state owned by exactly one transaction engine.

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session open
    Closed,

    /// Session open and ready for transactions
    Open,
}

/// Session state and transaction ID generation
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID (0 when closed)
    session_id: u32,

    /// Next transaction ID to hand out
    next_transaction_id: u32,

    /// Current session state
    state: SessionState,
}

impl Session {
    /// First transaction ID of a session
    pub const INITIAL_TRANSACTION_ID: u32 = 1;

    /// Transaction ID used by OpenSession
    pub const OPEN_SESSION_TRANSACTION_ID: u32 = 0;

    /// Create a new closed session
    pub fn new() -> Self {
        Self {
            session_id: 0,
            next_transaction_id: Self::INITIAL_TRANSACTION_ID,
            state: SessionState::Closed,
        }
    }

    /// Get current session ID
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if open
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open)
    }

    /// Mark the session open after a successful OpenSession
    pub fn open(&mut self, session_id: u32) -> Result<()> {
        if session_id == 0 {
            return Err(Error::InvalidSessionId(session_id));
        }

        if self.state != SessionState::Closed {
            return Err(Error::InvalidSessionState(format!(
                "Cannot open session {} from state: {:?}",
                session_id, self.state
            )));
        }

        self.session_id = session_id;
        self.next_transaction_id = Self::INITIAL_TRANSACTION_ID;
        self.state = SessionState::Open;

        Ok(())
    }

    /// Close session
    pub fn close(&mut self) {
        self.session_id = 0;
        self.next_transaction_id = Self::INITIAL_TRANSACTION_ID;
        self.state = SessionState::Closed;
    }

    /// Peek at the ID the next transaction will use
    pub fn peek_transaction_id(&self) -> u32 {
        self.next_transaction_id
    }

    /// Allocate the next transaction ID
    ///
    /// IDs start at 1 and increment per transaction. An allocated ID is
    /// consumed even if its transaction fails. After 0xFFFFFFFF the counter
    /// wraps to 1; 0 is reserved for OpenSession.
    pub fn next_transaction_id(&mut self) -> u32 {
        let current = self.next_transaction_id;

        self.next_transaction_id = match current.wrapping_add(1) {
            0 => Self::INITIAL_TRANSACTION_ID,
            next => next,
        };

        current
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
