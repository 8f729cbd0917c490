//! Error types for ptprust-core

/// Result type alias for ptprust-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wire frame violates the framing invariants
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Event record with a corrupt length
    #[error("Malformed event record at offset {offset}: {reason}")]
    MalformedEvent {
        offset: usize,
        reason: String,
    },

    /// Operations carry at most five parameters
    #[error("Too many parameters: {count} (max: {max})")]
    TooManyParameters {
        count: usize,
        max: usize,
    },

    /// Unknown operation code
    #[error("Unknown operation code: 0x{0:04X}")]
    UnknownOperation(u16),

    /// Unknown response code
    #[error("Unknown response code: 0x{0:04X}")]
    UnknownResponse(u16),

    /// Unknown vendor event code
    #[error("Unknown event code: 0x{0:04X}")]
    UnknownEvent(u32),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Session identifier rejected before use
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(u32),
}

impl Error {
    /// Shorthand for [`Error::MalformedPacket`]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket(reason.into())
    }

    /// Check if error requires the session to be reopened
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Self::InvalidSessionState(_) | Self::MalformedPacket(_)
        )
    }
}
