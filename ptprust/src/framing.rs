//! Wire framing strategies
//!
//! A transaction is the same three phases on every transport; only the
//! framing differs. PTP/IP wraps phases in typed packets and splits data into
//! StartData/Data/EndData, USB wraps each phase in one generic container.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use tracing::trace;

use ptprust_core::{
    constants::MAX_FRAME_SIZE, Container, ContainerHeader, ContainerType, Operation, Packet,
    PacketHeader, Response,
};
use ptprust_transport::Transport;

use crate::error::{Error, Result};

/// What a framing read off the channel for the current transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete data phase, transport headers stripped
    Data { transaction_id: u32, payload: Bytes },

    /// The response phase
    Response(Response),
}

/// Encodes transaction phases onto a channel and decodes them back
#[async_trait]
pub trait Framing: Send + Sync {
    /// Send the command phase
    async fn send_command(
        &self,
        transport: &mut dyn Transport,
        operation: &Operation,
        transaction_id: u32,
    ) -> Result<()>;

    /// Send an initiator-to-responder data phase
    async fn send_data(
        &self,
        transport: &mut dyn Transport,
        code: u16,
        transaction_id: u32,
        payload: &[u8],
    ) -> Result<()>;

    /// Read the next data phase or response
    async fn receive(&self, transport: &mut dyn Transport, timeout: Duration) -> Result<Inbound>;
}

/// Read a frame body of `len` bytes after its header was read
///
/// A channel that closes or stalls mid-frame leaves a truncated frame and
/// the stream without a usable frame boundary.
async fn read_body(transport: &mut dyn Transport, len: usize, timeout: Duration) -> Result<Bytes> {
    if len > MAX_FRAME_SIZE {
        return Err(ptprust_core::Error::malformed(format!(
            "frame body of {} bytes exceeds the {} byte limit",
            len, MAX_FRAME_SIZE
        ))
        .into());
    }

    match transport.receive_exact(len, timeout).await {
        Ok(body) => Ok(body.freeze()),
        Err(ptprust_transport::Error::ConnectionClosed) => Err(ptprust_core::Error::malformed(
            format!("channel closed inside a {} byte frame body", len),
        )
        .into()),
        Err(ptprust_transport::Error::ReadTimeout) => Err(ptprust_core::Error::malformed(
            format!("timed out inside a {} byte frame body", len),
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Consume the body of a frame whose header was rejected
///
/// Only done when the declared length is usable, so the next read starts
/// on a frame boundary.
async fn skip_rejected_body(
    transport: &mut dyn Transport,
    head: &[u8],
    header_size: usize,
    timeout: Duration,
) -> Result<()> {
    let mut raw = head;
    let length = raw.get_u32_le() as usize;

    if length >= header_size && length - header_size <= MAX_FRAME_SIZE {
        trace!("Discarding {} byte body of a rejected frame", length - header_size);
        read_body(transport, length - header_size, timeout).await?;
    }

    Ok(())
}

/// Write one PTP/IP packet
pub async fn write_packet(transport: &mut dyn Transport, packet: &Packet) -> Result<()> {
    trace!("Sending: {:?}", packet);

    let data = packet.encode();
    transport.send(&data).await?;

    Ok(())
}

/// Read exactly one PTP/IP packet
pub async fn read_packet(transport: &mut dyn Transport, timeout: Duration) -> Result<Packet> {
    let head = transport.receive_exact(PacketHeader::SIZE, timeout).await?;
    let header = match PacketHeader::decode(&head) {
        Ok(header) => header,
        Err(e) => {
            skip_rejected_body(transport, &head, PacketHeader::SIZE, timeout).await?;
            return Err(e.into());
        }
    };

    let payload = read_body(transport, header.payload_len(), timeout).await?;
    let packet = Packet::decode_payload(header.packet_type, payload)?;

    trace!("Received: {:?}", packet);

    Ok(packet)
}

/// PTP/IP packet framing
#[derive(Debug, Clone, Copy)]
pub struct IpFraming {
    chunk_size: usize,
}

impl IpFraming {
    /// Default size of outgoing data chunks
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Split outgoing data phases into chunks of at most `size` bytes
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    async fn receive_data(
        &self,
        transport: &mut dyn Transport,
        transaction_id: u32,
        total_length: u64,
        timeout: Duration,
    ) -> Result<Inbound> {
        // Capacity is capped: the announced length comes off the wire
        let mut payload = Vec::with_capacity((total_length as usize).min(Self::DEFAULT_CHUNK_SIZE));

        loop {
            let (chunk_tid, chunk, last) = match read_packet(transport, timeout).await? {
                Packet::Data {
                    transaction_id,
                    payload,
                } => (transaction_id, payload, false),
                Packet::EndData {
                    transaction_id,
                    payload,
                } => (transaction_id, payload, true),
                other => {
                    return Err(Error::ProtocolViolation(format!(
                        "unexpected {:?} packet inside a data phase",
                        other.packet_type()
                    )));
                }
            };

            if chunk_tid != transaction_id {
                return Err(Error::ProtocolViolation(format!(
                    "data chunk for transaction {} inside data phase of transaction {}",
                    chunk_tid, transaction_id
                )));
            }

            payload.extend_from_slice(&chunk);

            if last {
                break;
            }
        }

        if payload.len() as u64 != total_length {
            return Err(Error::ProtocolViolation(format!(
                "data phase announced {} bytes but carried {}",
                total_length,
                payload.len()
            )));
        }

        Ok(Inbound::Data {
            transaction_id,
            payload: Bytes::from(payload),
        })
    }
}

impl Default for IpFraming {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Framing for IpFraming {
    async fn send_command(
        &self,
        transport: &mut dyn Transport,
        operation: &Operation,
        transaction_id: u32,
    ) -> Result<()> {
        write_packet(transport, &Packet::operation_request(operation, transaction_id)).await
    }

    async fn send_data(
        &self,
        transport: &mut dyn Transport,
        _code: u16,
        transaction_id: u32,
        payload: &[u8],
    ) -> Result<()> {
        let start = Packet::StartData {
            transaction_id,
            total_length: payload.len() as u64,
        };
        write_packet(transport, &start).await?;

        let mut chunks = payload.chunks(self.chunk_size).peekable();
        if chunks.peek().is_none() {
            let end = Packet::EndData {
                transaction_id,
                payload: Bytes::new(),
            };
            return write_packet(transport, &end).await;
        }

        while let Some(chunk) = chunks.next() {
            let payload = Bytes::copy_from_slice(chunk);
            let packet = if chunks.peek().is_some() {
                Packet::Data {
                    transaction_id,
                    payload,
                }
            } else {
                Packet::EndData {
                    transaction_id,
                    payload,
                }
            };
            write_packet(transport, &packet).await?;
        }

        Ok(())
    }

    async fn receive(&self, transport: &mut dyn Transport, timeout: Duration) -> Result<Inbound> {
        match read_packet(transport, timeout).await? {
            Packet::OperationResponse {
                code,
                transaction_id,
                params,
            } => Ok(Inbound::Response(Response::new(code, transaction_id, params))),
            Packet::StartData {
                transaction_id,
                total_length,
            } => {
                self.receive_data(transport, transaction_id, total_length, timeout)
                    .await
            }
            other => Err(Error::ProtocolViolation(format!(
                "unexpected {:?} packet on the command channel",
                other.packet_type()
            ))),
        }
    }
}

/// PTP USB container framing
#[derive(Debug, Clone, Copy, Default)]
pub struct UsbFraming;

impl UsbFraming {
    pub fn new() -> Self {
        Self
    }

    async fn write_container(&self, transport: &mut dyn Transport, container: &Container) -> Result<()> {
        trace!("Sending: {:?}", container);

        transport.send(&container.encode()).await?;

        Ok(())
    }
}

#[async_trait]
impl Framing for UsbFraming {
    async fn send_command(
        &self,
        transport: &mut dyn Transport,
        operation: &Operation,
        transaction_id: u32,
    ) -> Result<()> {
        self.write_container(transport, &Container::command(operation, transaction_id))
            .await
    }

    async fn send_data(
        &self,
        transport: &mut dyn Transport,
        code: u16,
        transaction_id: u32,
        payload: &[u8],
    ) -> Result<()> {
        let container = Container::data(code, transaction_id, Bytes::copy_from_slice(payload));
        self.write_container(transport, &container).await
    }

    async fn receive(&self, transport: &mut dyn Transport, timeout: Duration) -> Result<Inbound> {
        let head = transport.receive_exact(ContainerHeader::SIZE, timeout).await?;
        let header = match ContainerHeader::decode(&head) {
            Ok(header) => header,
            Err(e) => {
                skip_rejected_body(transport, &head, ContainerHeader::SIZE, timeout).await?;
                return Err(e.into());
            }
        };

        let payload = read_body(transport, header.payload_len(), timeout).await?;
        let container = Container::from_parts(header, payload);

        trace!("Received: {:?}", container);

        match container.kind {
            ContainerType::Data => Ok(Inbound::Data {
                transaction_id: container.transaction_id,
                payload: container.payload,
            }),
            ContainerType::Response => Ok(Inbound::Response(Response::new(
                container.code,
                container.transaction_id,
                container.params()?,
            ))),
            kind => Err(Error::ProtocolViolation(format!(
                "unexpected {:?} container in a transaction",
                kind
            ))),
        }
    }
}
