//! PTP USB container structure and encoding/decoding
//!
//! USB bulk transfers wrap every transaction phase in a generic container
//! with a 12-byte header. The container codec follows the same frame
//! boundary discipline as the PTP/IP [`Packet`](crate::Packet) codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    error::{Error, Result},
    operation::Operation,
};

/// Container type field
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ContainerType {
    Command = 1,
    Data = 2,
    Response = 3,
    Event = 4,
}

impl TryFrom<u16> for ContainerType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Command),
            2 => Ok(Self::Data),
            3 => Ok(Self::Response),
            4 => Ok(Self::Event),
            _ => Err(Error::malformed(format!("unknown container type {}", value))),
        }
    }
}

/// Decoded 12-byte container header
///
/// ```text
/// ┌─────────────┬───────────┬───────────┬───────────────┬───────────┐
/// │   Length    │   Type    │   Code    │ TransactionID │  Payload  │
/// │   4 bytes   │  2 bytes  │  2 bytes  │    4 bytes    │  N bytes  │
/// └─────────────┴───────────┴───────────┴───────────────┴───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Total container length, header included
    pub length: u32,
    pub kind: ContainerType,
    pub code: u16,
    pub transaction_id: u32,
}

impl ContainerHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    /// Decode and validate a header from the first 12 bytes of `buf`
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::malformed(format!(
                "truncated container header: {} of {} bytes",
                buf.len(),
                Self::SIZE
            )));
        }

        let length = buf.get_u32_le();
        let kind = buf.get_u16_le();
        let code = buf.get_u16_le();
        let transaction_id = buf.get_u32_le();

        if (length as usize) < Self::SIZE {
            return Err(Error::malformed(format!(
                "declared container length {} is shorter than the header",
                length
            )));
        }

        Ok(Self {
            length,
            kind: ContainerType::try_from(kind)?,
            code,
            transaction_id,
        })
    }

    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        self.length as usize - Self::SIZE
    }
}

/// PTP USB generic container
#[derive(Clone, PartialEq, Eq)]
pub struct Container {
    pub kind: ContainerType,
    pub code: u16,
    pub transaction_id: u32,
    pub payload: Bytes,
}

impl Container {
    /// Container header size in bytes
    pub const HEADER_SIZE: usize = ContainerHeader::SIZE;

    /// Command container for an operation
    pub fn command(operation: &Operation, transaction_id: u32) -> Self {
        Self {
            kind: ContainerType::Command,
            code: operation.code(),
            transaction_id,
            payload: params_to_bytes(operation.params()),
        }
    }

    /// Data container
    pub fn data(code: u16, transaction_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: ContainerType::Data,
            code,
            transaction_id,
            payload: payload.into(),
        }
    }

    /// Response container
    pub fn response(code: u16, transaction_id: u32, params: &[u32]) -> Self {
        Self {
            kind: ContainerType::Response,
            code,
            transaction_id,
            payload: params_to_bytes(params),
        }
    }

    /// Interpret the payload as command/response parameters
    ///
    /// # Errors
    ///
    /// [`Error::MalformedPacket`] unless the payload holds 0-5 whole u32 values.
    pub fn params(&self) -> Result<Vec<u32>> {
        let mut payload = self.payload.clone();

        if payload.len() % 4 != 0 || payload.len() / 4 > Operation::MAX_PARAMS {
            return Err(Error::malformed(format!(
                "{} parameter bytes in {:?} container",
                payload.len(),
                self.kind
            )));
        }

        let mut params = Vec::with_capacity(payload.len() / 4);
        while payload.has_remaining() {
            params.push(payload.get_u32_le());
        }
        Ok(params)
    }

    /// Total container size, header included
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Encode container to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u32_le(self.size() as u32);
        buf.put_u16_le(self.kind as u16);
        buf.put_u16_le(self.code);
        buf.put_u32_le(self.transaction_id);
        buf.put_slice(&self.payload);

        buf
    }

    /// Decode exactly one container from the front of `buf`
    pub fn decode(buf: &mut BytesMut) -> Result<Self> {
        let header = ContainerHeader::decode(buf)?;

        let available = buf.len() - ContainerHeader::SIZE;
        if available < header.payload_len() {
            return Err(Error::malformed(format!(
                "truncated {:?} container: {} of {} payload bytes",
                header.kind,
                available,
                header.payload_len()
            )));
        }

        let mut frame = buf.split_to(header.length as usize);
        frame.advance(ContainerHeader::SIZE);

        Ok(Self::from_parts(header, frame.freeze()))
    }

    /// Assemble a container from a header and its payload
    pub fn from_parts(header: ContainerHeader, payload: Bytes) -> Self {
        Self {
            kind: header.kind,
            code: header.code,
            transaction_id: header.transaction_id,
            payload,
        }
    }
}

fn params_to_bytes(params: &[u32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 * params.len());
    for param in params {
        buf.put_u32_le(*param);
    }
    buf.freeze()
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("kind", &self.kind)
            .field("code", &format!("0x{:04X}", self.code))
            .field("transaction_id", &self.transaction_id)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
