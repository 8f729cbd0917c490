//! In-memory transport
//!
//! Reads are served from a preloaded inbound buffer and writes are captured
//! in an outbound buffer. Reads never wait: bytes that are not already queued
//! will never arrive, so a short read ends the channel.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tracing::trace;

use crate::{Transport, error::*};

/// Loopback transport backed by byte buffers
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: BytesMut,
    outbound: BytesMut,
    connected: bool,
    fail_next_write: bool,
    bytes_read: usize,
}

impl MemoryTransport {
    /// Create a connected transport with nothing queued
    pub fn new() -> Self {
        Self {
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
            connected: true,
            fail_next_write: false,
            bytes_read: 0,
        }
    }

    /// Create a connected transport with `data` queued for reading
    pub fn with_inbound(data: impl AsRef<[u8]>) -> Self {
        let mut transport = Self::new();
        transport.push_inbound(data);
        transport
    }

    /// Queue bytes for reading
    pub fn push_inbound(&mut self, data: impl AsRef<[u8]>) {
        self.inbound.extend_from_slice(data.as_ref());
    }

    /// Bytes queued but not yet read
    pub fn inbound_remaining(&self) -> usize {
        self.inbound.len()
    }

    /// Everything written so far
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Take everything written so far
    pub fn take_outbound(&mut self) -> BytesMut {
        self.outbound.split()
    }

    /// Total bytes handed out by reads
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Make the next write fail with a broken pipe
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected write failure",
            )));
        }

        trace!("Sending {} bytes: {}", data.len(), hex::encode(data));
        self.outbound.extend_from_slice(data);
        Ok(())
    }

    async fn receive_exact(&mut self, len: usize, _timeout: Duration) -> Result<BytesMut> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.inbound.len() < len {
            self.bytes_read += self.inbound.len();
            self.inbound.clear();
            return Err(Error::ConnectionClosed);
        }

        self.bytes_read += len;
        let buf = self.inbound.split_to(len);
        trace!("Received {} bytes: {}", len, hex::encode(&buf));
        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        "memory".to_string()
    }
}
