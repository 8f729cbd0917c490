//! # ptprust
//!
//! Rust implementation of the Picture Transfer Protocol transaction layer,
//! with the Canon EOS vendor extension.
//!
//! ## Features
//!
//! - PTP/IP packet and USB container framing
//! - Async/await API using Tokio
//! - Session and transaction ID management
//! - Canon EOS event polling and remote capture
//!
//! ## Quick Start
//!
//! ```no_run
//! use ptprust::{HostIdentity, Initiator};
//!
//! #[tokio::main]
//! async fn main() -> ptprust::Result<()> {
//!     let host = HostIdentity::new([0x42; 16], "ptprust", "1.0");
//!
//!     // Connect and open a session
//!     let mut camera = Initiator::connect_ip("192.168.1.2", 15740, &host).await?;
//!     camera.open_session(1).await?;
//!
//!     // Take a picture
//!     camera.initiate_capture(0, 0).await?;
//!
//!     camera.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod initiator;

// Re-exports
pub use engine::{TransactionEngine, TransactionPhase};
pub use error::{Error, Result};
pub use framing::{Framing, Inbound, IpFraming, UsbFraming};
pub use initiator::Initiator;

// Re-export types
pub use ptprust_core::{
    Event, EventCode, Guid, HostIdentity, Operation, OperationCode, Response, ResponseCode,
    Session,
};
pub use ptprust_transport::{MemoryTransport, TcpTransport, Transport};
pub use ptprust_types::{Capabilities, DeviceInfo, DevicePropDesc, PropForm, PropValue};
