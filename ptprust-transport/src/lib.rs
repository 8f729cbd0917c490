//! Transport layer for PTP
//!
//! Provides the duplex byte channel the transaction engine talks through:
//! TCP for PTP/IP, and an in-memory channel for tests and loopback use.

pub mod error;
pub mod memory;
pub mod tcp;

pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from device
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Write all bytes and flush
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes, waiting at most `timeout`
    ///
    /// Fails with [`Error::ConnectionClosed`] if the channel ends first.
    async fn receive_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn connect(&mut self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data).await
    }

    async fn receive_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut> {
        (**self).receive_exact(len, timeout).await
    }

    fn remote_addr(&self) -> String {
        (**self).remote_addr()
    }
}
