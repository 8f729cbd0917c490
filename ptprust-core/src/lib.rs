//! # ptprust-core
//!
//! Core protocol implementation for the Picture Transfer Protocol.
//!
//! This crate provides the low-level protocol primitives:
//! - PTP/IP packet structure and encoding/decoding
//! - PTP USB container encoding/decoding
//! - Operation, response and vendor event code tables
//! - Session state and transaction ID generation
//! - Canon EOS event stream decoding
//! - Protocol constants

pub mod constants;
pub mod container;
pub mod error;
pub mod event;
pub mod identity;
pub mod operation;
pub mod packet;
pub mod session;

pub use container::{Container, ContainerHeader, ContainerType};
pub use error::{Error, Result};
pub use event::{Event, EventCode, EventParser};
pub use identity::{Guid, HostIdentity};
pub use operation::{Operation, OperationCode, Response, ResponseCode};
pub use packet::{Packet, PacketHeader, PacketType};
pub use session::{Session, SessionState};

/// PTP/IP protocol version sent in the handshake
pub const PROTOCOL_VERSION: &str = "1.0";

/// Default PTP/IP port
pub const DEFAULT_PORT: u16 = constants::DEFAULT_PORT;

/// Maximum frame size accepted from a channel
pub const MAX_PACKET_SIZE: usize = constants::MAX_FRAME_SIZE;

/// PTP/IP packet header size
pub const HEADER_SIZE: usize = PacketHeader::SIZE;
