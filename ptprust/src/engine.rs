//! Transaction engine
//!
//! Runs PTP transactions over a channel: command phase, optional data phase
//! in either direction, response phase. The engine owns the channel and the
//! session, so one transaction at a time is enforced by `&mut self`.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use ptprust_core::{Operation, OperationCode, Response, Session};
use ptprust_transport::Transport;

use crate::{
    error::{Error, Result},
    framing::{Framing, Inbound, IpFraming},
};

/// Where the current transaction is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Idle,
    CommandSent,
    DataPhase,
    ResponseReceived,
}

/// Direction of a transaction's data phase
#[derive(Debug, Clone, Copy)]
enum DataPhase<'a> {
    None,
    Send(&'a [u8]),
    Receive,
}

/// Single-session PTP transaction engine
pub struct TransactionEngine<T, F = IpFraming> {
    transport: T,
    framing: F,
    session: Session,
    phase: TransactionPhase,
    timeout: Duration,
}

impl<T: Transport, F: Framing> TransactionEngine<T, F> {
    /// Create an engine over a connected channel
    pub fn new(transport: T, framing: F) -> Self {
        Self {
            transport,
            framing,
            session: Session::new(),
            phase: TransactionPhase::Idle,
            timeout: Duration::from_secs(ptprust_core::constants::DEFAULT_READ_TIMEOUT),
        }
    }

    /// Set per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    /// Check if a session is open
    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open a session
    ///
    /// OpenSession is sent with transaction ID 0. An `OK` response opens the
    /// session and restarts transaction IDs at 1; any other response code is
    /// returned unchanged and leaves the session closed.
    ///
    /// # Errors
    ///
    /// - [`ptprust_core::Error::InvalidSessionId`] for session ID 0
    /// - [`ptprust_core::Error::InvalidSessionState`] if a session is already open
    pub async fn open_session(&mut self, session_id: u32) -> Result<Response> {
        if session_id == 0 {
            return Err(ptprust_core::Error::InvalidSessionId(session_id).into());
        }

        if self.session.is_open() {
            return Err(ptprust_core::Error::InvalidSessionState(format!(
                "session {} is already open",
                self.session.session_id()
            ))
            .into());
        }

        let operation = Operation::with_params(OperationCode::OpenSession, [session_id])?;
        let (_, response) = self
            .execute(&operation, Session::OPEN_SESSION_TRANSACTION_ID, DataPhase::None)
            .await?;

        if response.is_ok() {
            self.session.open(session_id)?;
            info!("Session {} opened", session_id);
        }

        Ok(response)
    }

    /// Close the session
    ///
    /// The session is closed once the exchange completes, whatever the
    /// response code.
    pub async fn close_session(&mut self) -> Result<Response> {
        let operation = Operation::new(OperationCode::CloseSession);
        let response = self.transact_no_data(&operation).await?;

        info!("Session {} closed", self.session.session_id());
        self.session.close();

        Ok(response)
    }

    /// Run a transaction without a data phase
    pub async fn transact_no_data(&mut self, operation: &Operation) -> Result<Response> {
        let transaction_id = self.allocate_transaction_id()?;
        let (_, response) = self
            .execute(operation, transaction_id, DataPhase::None)
            .await?;
        Ok(response)
    }

    /// Run a transaction sending `payload` to the responder
    pub async fn transact_send_data(
        &mut self,
        operation: &Operation,
        payload: &[u8],
    ) -> Result<Response> {
        let transaction_id = self.allocate_transaction_id()?;
        let (_, response) = self
            .execute(operation, transaction_id, DataPhase::Send(payload))
            .await?;
        Ok(response)
    }

    /// Run a transaction receiving data from the responder
    ///
    /// A responder that skips the data phase yields an empty payload.
    pub async fn transact_receive_data(&mut self, operation: &Operation) -> Result<(Bytes, Response)> {
        let transaction_id = self.allocate_transaction_id()?;
        let (data, response) = self
            .execute(operation, transaction_id, DataPhase::Receive)
            .await?;
        Ok((data.unwrap_or_default(), response))
    }

    fn allocate_transaction_id(&mut self) -> Result<u32> {
        if !self.session.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(self.session.next_transaction_id())
    }

    async fn execute(
        &mut self,
        operation: &Operation,
        transaction_id: u32,
        data: DataPhase<'_>,
    ) -> Result<(Option<Bytes>, Response)> {
        debug!(tx = transaction_id, "Executing {}", operation);

        let result = self.exchange(operation, transaction_id, data).await;
        self.phase = TransactionPhase::Idle;

        match &result {
            Ok((_, response)) => debug!(tx = transaction_id, "Completed: {}", response),
            Err(e) if e.closes_session() => {
                warn!(tx = transaction_id, "Channel out of step, closing session: {}", e);
                self.session.close();
            }
            Err(e) => warn!(tx = transaction_id, "Transaction aborted: {}", e),
        }

        result
    }

    async fn exchange(
        &mut self,
        operation: &Operation,
        transaction_id: u32,
        data: DataPhase<'_>,
    ) -> Result<(Option<Bytes>, Response)> {
        self.framing
            .send_command(&mut self.transport, operation, transaction_id)
            .await?;
        self.phase = TransactionPhase::CommandSent;

        if let DataPhase::Send(payload) = data {
            self.phase = TransactionPhase::DataPhase;
            self.framing
                .send_data(&mut self.transport, operation.code(), transaction_id, payload)
                .await?;
        }

        let mut received = None;

        loop {
            match self.framing.receive(&mut self.transport, self.timeout).await? {
                Inbound::Data {
                    transaction_id: data_tid,
                    payload,
                } => {
                    if !matches!(data, DataPhase::Receive) {
                        return Err(Error::ProtocolViolation(format!(
                            "unexpected data phase for {}",
                            operation
                        )));
                    }
                    if received.is_some() {
                        return Err(Error::ProtocolViolation(format!(
                            "second data phase for {}",
                            operation
                        )));
                    }
                    if data_tid != transaction_id {
                        return Err(Error::ProtocolViolation(format!(
                            "data phase for transaction {} while waiting for {}",
                            data_tid, transaction_id
                        )));
                    }

                    self.phase = TransactionPhase::DataPhase;
                    received = Some(payload);
                }
                Inbound::Response(response) => {
                    if response.transaction_id != transaction_id {
                        return Err(Error::ProtocolViolation(format!(
                            "response for transaction {} while waiting for {}",
                            response.transaction_id, transaction_id
                        )));
                    }

                    self.phase = TransactionPhase::ResponseReceived;
                    return Ok((received, response));
                }
            }
        }
    }
}
