//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] ptprust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] ptprust_transport::Error),

    #[error("Dataset error: {0}")]
    Types(#[from] ptprust_types::Error),

    /// No open session
    #[error("Device not connected")]
    NotConnected,

    #[error("Operation not supported by device: 0x{0:04X}")]
    UnsupportedOperation(u16),

    #[error("Property not supported by device: 0x{0:04X}")]
    UnsupportedProperty(u16),

    /// Responder broke the transaction protocol; the session has been closed
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Responder answered with a non-OK response code
    #[error("Device returned 0x{code:04X} {params:X?}")]
    Device {
        code: u16,
        params: Vec<u32>,
    },

    /// Release failed because autofocus did not lock
    #[error("Capture failed: focus not achieved")]
    NoFocus,

    /// Release failed because the card is full
    #[error("Capture failed: storage full")]
    StorageFull,

    /// Responder refused the PTP/IP handshake
    #[error("Connection refused by responder (reason: 0x{0:08X})")]
    InitFailed(u32),

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if the same session can be used for further transactions
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperation(_)
                | Self::UnsupportedProperty(_)
                | Self::Device { .. }
                | Self::NoFocus
                | Self::StorageFull
                | Self::Types(_)
        ) || matches!(self, Self::Transport(ptprust_transport::Error::ReadTimeout))
    }

    /// Check if the channel lost step with the device, ending the session
    pub fn closes_session(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_) | Self::Core(ptprust_core::Error::MalformedPacket(_))
        )
    }

    /// Check if the connection must be re-established
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_fatal(),
            Self::Core(e) => e.requires_reconnect(),
            Self::ProtocolViolation(_) | Self::InitFailed(_) => true,
            _ => false,
        }
    }

    /// Response code carried by a device error
    pub fn device_code(&self) -> Option<u16> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }
}
