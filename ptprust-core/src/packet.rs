//! PTP/IP packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    error::{Error, Result},
    identity::{Guid, HostIdentity},
    operation::Operation,
};

/// PTP/IP packet type tags
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketType {
    InitCommandRequest = 1,
    InitCommandAck = 2,
    InitEventRequest = 3,
    InitEventAck = 4,
    InitFail = 5,
    OperationRequest = 6,
    OperationResponse = 7,
    Event = 8,
    StartData = 9,
    Data = 10,
    Cancel = 11,
    EndData = 12,
    ProbeRequest = 13,
    ProbeResponse = 14,
}

impl From<PacketType> for u32 {
    fn from(packet_type: PacketType) -> u32 {
        packet_type as u32
    }
}

impl TryFrom<u32> for PacketType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::InitCommandRequest),
            2 => Ok(Self::InitCommandAck),
            3 => Ok(Self::InitEventRequest),
            4 => Ok(Self::InitEventAck),
            5 => Ok(Self::InitFail),
            6 => Ok(Self::OperationRequest),
            7 => Ok(Self::OperationResponse),
            8 => Ok(Self::Event),
            9 => Ok(Self::StartData),
            10 => Ok(Self::Data),
            11 => Ok(Self::Cancel),
            12 => Ok(Self::EndData),
            13 => Ok(Self::ProbeRequest),
            14 => Ok(Self::ProbeResponse),
            _ => Err(Error::malformed(format!("unknown packet type {}", value))),
        }
    }
}

/// Decoded 8-byte PTP/IP frame header
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┐
/// │   Length    │    Type     │   Payload   │
/// │   4 bytes   │   4 bytes   │ Length - 8  │
/// │  (LE u32)   │  (LE u32)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total frame length, header included
    pub length: u32,

    /// Packet type tag
    pub packet_type: PacketType,
}

impl PacketHeader {
    /// Header size in bytes
    pub const SIZE: usize = 8;

    /// Decode and validate a header from the first 8 bytes of `buf`
    ///
    /// # Errors
    ///
    /// [`Error::MalformedPacket`] if fewer than 8 bytes are given, the declared
    /// length is below 8, or the type tag is unknown.
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::malformed(format!(
                "truncated header: {} of {} bytes",
                buf.len(),
                Self::SIZE
            )));
        }

        let length = buf.get_u32_le();
        let packet_type = buf.get_u32_le();

        if (length as usize) < Self::SIZE {
            return Err(Error::malformed(format!(
                "declared length {} is shorter than the header",
                length
            )));
        }

        Ok(Self {
            length,
            packet_type: PacketType::try_from(packet_type)?,
        })
    }

    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        self.length as usize - Self::SIZE
    }
}

/// PTP/IP packet
///
/// All multi-byte values are little-endian; strings are UTF-16LE and
/// null-terminated.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use ptprust_core::{HostIdentity, Packet};
///
/// let packet = Packet::InitCommandRequest(HostIdentity::new([0u8; 16], "host", "1.0"));
/// let mut encoded = packet.encode();
///
/// let decoded = Packet::decode(&mut encoded).unwrap();
/// assert_eq!(packet, decoded);
/// assert!(encoded.is_empty());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum Packet {
    /// Initiator announces itself on the command channel
    InitCommandRequest(HostIdentity),

    /// Responder accepts the command channel
    InitCommandAck {
        session_id: u32,
        identity: HostIdentity,
    },

    /// Initiator binds the event channel to a connection
    InitEventRequest {
        session_id: u32,
    },

    /// Responder accepts the event channel
    InitEventAck,

    /// Responder rejects the connection
    InitFail {
        error: u32,
    },

    /// Command phase of a transaction
    OperationRequest {
        code: u16,
        transaction_id: u32,
        params: Vec<u32>,
    },

    /// Response phase of a transaction
    OperationResponse {
        code: u16,
        transaction_id: u32,
        params: Vec<u32>,
    },

    /// Asynchronous event on the event channel
    Event {
        code: u16,
        transaction_id: u32,
        params: Vec<u32>,
    },

    /// Opens a data phase
    StartData {
        transaction_id: u32,
        total_length: u64,
    },

    /// Intermediate data chunk
    Data {
        transaction_id: u32,
        payload: Bytes,
    },

    /// Cancels a transaction
    Cancel {
        transaction_id: u32,
    },

    /// Final data chunk
    EndData {
        transaction_id: u32,
        payload: Bytes,
    },

    /// Liveness probe
    ProbeRequest,

    /// Liveness probe answer
    ProbeResponse,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = PacketHeader::SIZE;

    /// Maximum number of parameters in request/response/event packets
    pub const MAX_PARAMS: usize = Operation::MAX_PARAMS;

    /// Build the command packet for an operation
    pub fn operation_request(operation: &Operation, transaction_id: u32) -> Self {
        Self::OperationRequest {
            code: operation.code(),
            transaction_id,
            params: operation.params().to_vec(),
        }
    }

    /// Type tag of this packet
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::InitCommandRequest(_) => PacketType::InitCommandRequest,
            Self::InitCommandAck { .. } => PacketType::InitCommandAck,
            Self::InitEventRequest { .. } => PacketType::InitEventRequest,
            Self::InitEventAck => PacketType::InitEventAck,
            Self::InitFail { .. } => PacketType::InitFail,
            Self::OperationRequest { .. } => PacketType::OperationRequest,
            Self::OperationResponse { .. } => PacketType::OperationResponse,
            Self::Event { .. } => PacketType::Event,
            Self::StartData { .. } => PacketType::StartData,
            Self::Data { .. } => PacketType::Data,
            Self::Cancel { .. } => PacketType::Cancel,
            Self::EndData { .. } => PacketType::EndData,
            Self::ProbeRequest => PacketType::ProbeRequest,
            Self::ProbeResponse => PacketType::ProbeResponse,
        }
    }

    /// Transaction identifier carried by this packet, if any
    pub fn transaction_id(&self) -> Option<u32> {
        match self {
            Self::OperationRequest { transaction_id, .. }
            | Self::OperationResponse { transaction_id, .. }
            | Self::Event { transaction_id, .. }
            | Self::StartData { transaction_id, .. }
            | Self::Data { transaction_id, .. }
            | Self::Cancel { transaction_id }
            | Self::EndData { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }

    /// Payload size in bytes
    pub fn payload_size(&self) -> usize {
        match self {
            Self::InitCommandRequest(identity) => identity_size(identity),
            Self::InitCommandAck { identity, .. } => 4 + identity_size(identity),
            Self::InitEventRequest { .. } | Self::InitFail { .. } | Self::Cancel { .. } => 4,
            Self::InitEventAck | Self::ProbeRequest | Self::ProbeResponse => 0,
            Self::OperationRequest { params, .. }
            | Self::OperationResponse { params, .. }
            | Self::Event { params, .. } => 6 + 4 * params.len(),
            Self::StartData { .. } => 12,
            Self::Data { payload, .. } | Self::EndData { payload, .. } => 4 + payload.len(),
        }
    }

    /// Total packet size, header included
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload_size()
    }

    /// Encode packet to bytes
    ///
    /// The length field is computed from the payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use ptprust_core::Packet;
    ///
    /// let bytes = Packet::InitEventAck.encode();
    /// assert_eq!(&bytes[..], &[8, 0, 0, 0, 4, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> BytesMut {
        let total_size = self.size();
        let mut buf = BytesMut::with_capacity(total_size);

        buf.put_u32_le(total_size as u32);
        buf.put_u32_le(self.packet_type().into());

        match self {
            Self::InitCommandRequest(identity) => put_identity(&mut buf, identity),
            Self::InitCommandAck { session_id, identity } => {
                buf.put_u32_le(*session_id);
                put_identity(&mut buf, identity);
            }
            Self::InitEventRequest { session_id } => buf.put_u32_le(*session_id),
            Self::InitFail { error } => buf.put_u32_le(*error),
            Self::Cancel { transaction_id } => buf.put_u32_le(*transaction_id),
            Self::InitEventAck | Self::ProbeRequest | Self::ProbeResponse => {}
            Self::OperationRequest { code, transaction_id, params }
            | Self::OperationResponse { code, transaction_id, params }
            | Self::Event { code, transaction_id, params } => {
                buf.put_u16_le(*code);
                buf.put_u32_le(*transaction_id);
                for param in params {
                    buf.put_u32_le(*param);
                }
            }
            Self::StartData { transaction_id, total_length } => {
                buf.put_u32_le(*transaction_id);
                buf.put_u64_le(*total_length);
            }
            Self::Data { transaction_id, payload } | Self::EndData { transaction_id, payload } => {
                buf.put_u32_le(*transaction_id);
                buf.put_slice(payload);
            }
        }

        debug_assert_eq!(buf.len(), total_size);
        buf
    }

    /// Decode exactly one packet from the front of `buf`
    ///
    /// Bytes after the declared frame length are left in `buf`, so packets
    /// written back to back can be decoded one after another.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPacket`] if:
    /// - the header is truncated or declares a length below 8
    /// - the type tag is unknown
    /// - fewer than `length - 8` payload bytes are available
    /// - the payload does not match the layout of its type
    pub fn decode(buf: &mut BytesMut) -> Result<Self> {
        let header = PacketHeader::decode(buf)?;

        let available = buf.len() - PacketHeader::SIZE;
        if available < header.payload_len() {
            return Err(Error::malformed(format!(
                "truncated {:?} frame: {} of {} payload bytes",
                header.packet_type,
                available,
                header.payload_len()
            )));
        }

        let mut frame = buf.split_to(header.length as usize);
        frame.advance(PacketHeader::SIZE);

        Self::decode_payload(header.packet_type, frame.freeze())
    }

    /// Decode a payload whose header was already read
    ///
    /// The payload must be exactly `length - 8` bytes.
    pub fn decode_payload(packet_type: PacketType, mut payload: Bytes) -> Result<Self> {
        let packet = match packet_type {
            PacketType::InitCommandRequest => Self::InitCommandRequest(get_identity(&mut payload)?),
            PacketType::InitCommandAck => Self::InitCommandAck {
                session_id: get_u32(&mut payload, "session id")?,
                identity: get_identity(&mut payload)?,
            },
            PacketType::InitEventRequest => Self::InitEventRequest {
                session_id: get_u32(&mut payload, "session id")?,
            },
            PacketType::InitEventAck => Self::InitEventAck,
            PacketType::InitFail => Self::InitFail {
                error: get_u32(&mut payload, "error code")?,
            },
            PacketType::OperationRequest => {
                let (code, transaction_id, params) = get_operation(&mut payload)?;
                Self::OperationRequest { code, transaction_id, params }
            }
            PacketType::OperationResponse => {
                let (code, transaction_id, params) = get_operation(&mut payload)?;
                Self::OperationResponse { code, transaction_id, params }
            }
            PacketType::Event => {
                let (code, transaction_id, params) = get_operation(&mut payload)?;
                Self::Event { code, transaction_id, params }
            }
            PacketType::StartData => {
                let transaction_id = get_u32(&mut payload, "transaction id")?;
                if payload.remaining() < 8 {
                    return Err(Error::malformed("truncated total length"));
                }
                Self::StartData {
                    transaction_id,
                    total_length: payload.get_u64_le(),
                }
            }
            PacketType::Data => Self::Data {
                transaction_id: get_u32(&mut payload, "transaction id")?,
                payload: payload.split_off(0),
            },
            PacketType::Cancel => Self::Cancel {
                transaction_id: get_u32(&mut payload, "transaction id")?,
            },
            PacketType::EndData => Self::EndData {
                transaction_id: get_u32(&mut payload, "transaction id")?,
                payload: payload.split_off(0),
            },
            PacketType::ProbeRequest => Self::ProbeRequest,
            PacketType::ProbeResponse => Self::ProbeResponse,
        };

        if payload.has_remaining() {
            return Err(Error::malformed(format!(
                "{} unexpected trailing bytes in {:?} payload",
                payload.remaining(),
                packet_type
            )));
        }

        Ok(packet)
    }
}

fn utf16z_size(s: &str) -> usize {
    2 * (wire_str(s).encode_utf16().count() + 1)
}

/// Part of `s` that survives null termination
fn wire_str(s: &str) -> &str {
    s.split('\0').next().unwrap_or_default()
}

fn identity_size(identity: &HostIdentity) -> usize {
    Guid::SIZE + utf16z_size(&identity.name) + utf16z_size(&identity.version)
}

fn put_utf16z(buf: &mut BytesMut, s: &str) {
    for unit in wire_str(s).encode_utf16() {
        buf.put_u16_le(unit);
    }
    buf.put_u16_le(0);
}

fn put_identity(buf: &mut BytesMut, identity: &HostIdentity) {
    buf.put_slice(identity.guid.as_bytes());
    put_utf16z(buf, &identity.name);
    put_utf16z(buf, &identity.version);
}

fn get_u32(buf: &mut Bytes, field: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(Error::malformed(format!("truncated {}", field)));
    }
    Ok(buf.get_u32_le())
}

/// Reads UTF-16LE code units up to a terminator or the end of the payload
fn get_utf16z(buf: &mut Bytes) -> Result<String> {
    let mut units = Vec::new();

    while buf.remaining() >= 2 {
        match buf.get_u16_le() {
            0 => break,
            unit => units.push(unit),
        }
    }

    String::from_utf16(&units).map_err(|e| Error::malformed(format!("invalid string: {}", e)))
}

fn get_identity(buf: &mut Bytes) -> Result<HostIdentity> {
    if buf.remaining() < Guid::SIZE {
        return Err(Error::malformed("truncated GUID"));
    }

    let mut guid = [0u8; Guid::SIZE];
    buf.copy_to_slice(&mut guid);

    Ok(HostIdentity {
        guid: Guid(guid),
        name: get_utf16z(buf)?,
        version: get_utf16z(buf)?,
    })
}

fn get_operation(buf: &mut Bytes) -> Result<(u16, u32, Vec<u32>)> {
    if buf.remaining() < 6 {
        return Err(Error::malformed("truncated operation header"));
    }

    let code = buf.get_u16_le();
    let transaction_id = buf.get_u32_le();

    if buf.remaining() % 4 != 0 || buf.remaining() / 4 > Packet::MAX_PARAMS {
        return Err(Error::malformed(format!(
            "{} parameter bytes do not form 0-{} parameters",
            buf.remaining(),
            Packet::MAX_PARAMS
        )));
    }

    let mut params = Vec::with_capacity(buf.remaining() / 4);
    while buf.has_remaining() {
        params.push(buf.get_u32_le());
    }

    Ok((code, transaction_id, params))
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitCommandRequest(identity) => {
                f.debug_tuple("InitCommandRequest").field(identity).finish()
            }
            Self::InitCommandAck { session_id, identity } => f
                .debug_struct("InitCommandAck")
                .field("session_id", session_id)
                .field("identity", identity)
                .finish(),
            Self::InitEventRequest { session_id } => f
                .debug_struct("InitEventRequest")
                .field("session_id", session_id)
                .finish(),
            Self::InitEventAck => f.write_str("InitEventAck"),
            Self::InitFail { error } => f
                .debug_struct("InitFail")
                .field("error", &format!("0x{:08X}", error))
                .finish(),
            Self::OperationRequest { code, transaction_id, params }
            | Self::OperationResponse { code, transaction_id, params }
            | Self::Event { code, transaction_id, params } => f
                .debug_struct(match self.packet_type() {
                    PacketType::OperationRequest => "OperationRequest",
                    PacketType::OperationResponse => "OperationResponse",
                    _ => "Event",
                })
                .field("code", &format!("0x{:04X}", code))
                .field("transaction_id", transaction_id)
                .field("params", params)
                .finish(),
            Self::StartData { transaction_id, total_length } => f
                .debug_struct("StartData")
                .field("transaction_id", transaction_id)
                .field("total_length", total_length)
                .finish(),
            Self::Data { transaction_id, payload } | Self::EndData { transaction_id, payload } => f
                .debug_struct(if matches!(self, Self::Data { .. }) { "Data" } else { "EndData" })
                .field("transaction_id", transaction_id)
                .field("payload_len", &payload.len())
                .finish(),
            Self::Cancel { transaction_id } => f
                .debug_struct("Cancel")
                .field("transaction_id", transaction_id)
                .finish(),
            Self::ProbeRequest => f.write_str("ProbeRequest"),
            Self::ProbeResponse => f.write_str("ProbeResponse"),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{:?}](len={}", self.packet_type(), self.size())?;
        if let Some(transaction_id) = self.transaction_id() {
            write!(f, ", tx={}", transaction_id)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const GUID1: [u8; 16] = [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x01, 0xf4, 0xa9, 0x97, 0xfa, 0x6a, 0xac,
    ];
    const GUID2: [u8; 16] = [
        0x01, 0x02, 0x03, 0x04, 0x10, 0x20, 0x30, 0x40,
        0x0a, 0x0b, 0x0c, 0x0d, 0xa0, 0xb0, 0xc0, 0xd0,
    ];

    fn roundtrip(packet: &Packet) -> Packet {
        let mut encoded = packet.encode();
        assert_eq!(encoded.len(), packet.size());
        let decoded = Packet::decode(&mut encoded).unwrap();
        assert!(encoded.is_empty());
        decoded
    }

    #[test]
    fn test_init_command_request_layout() {
        let packet = Packet::InitCommandRequest(HostIdentity::new(GUID1, "mypc1", "1.0"));
        let encoded = packet.encode();

        let mut expected = vec![44, 0, 0, 0, 1, 0, 0, 0];
        expected.extend_from_slice(&GUID1);
        expected.extend_from_slice(&[b'm', 0, b'y', 0, b'p', 0, b'c', 0, b'1', 0, 0, 0]);
        expected.extend_from_slice(&[b'1', 0, b'.', 0, b'0', 0, 0, 0]);

        assert_eq!(&encoded[..], expected.as_slice());
        assert_eq!(roundtrip(&packet), packet);
    }

    #[test]
    fn test_init_command_ack_roundtrip() {
        let packet = Packet::InitCommandAck {
            session_id: 0x00010203,
            identity: HostIdentity::new(GUID1, "mypc1", "1.0"),
        };
        assert_eq!(roundtrip(&packet), packet);
    }

    #[test]
    fn test_empty_host_name() {
        let packet = Packet::InitCommandRequest(HostIdentity::new(GUID2, "", ""));
        assert_eq!(packet.size(), 8 + 16 + 2 + 2);
        assert_eq!(roundtrip(&packet), packet);
    }

    #[test]
    fn test_host_name_with_interior_nul() {
        let packet = Packet::InitCommandRequest(HostIdentity::new(GUID1, "a\0b", "1.0"));
        assert_eq!(roundtrip(&packet), packet);

        let mut identity = HostIdentity::new(GUID1, "", "1.0");
        identity.name = "a\0b".to_string();
        let decoded = roundtrip(&Packet::InitCommandRequest(identity));
        assert_eq!(
            decoded,
            Packet::InitCommandRequest(HostIdentity::new(GUID1, "a", "1.0"))
        );
    }

    #[test]
    fn test_operation_request_layout() {
        let packet = Packet::OperationRequest {
            code: 0x1009,
            transaction_id: 7,
            params: vec![0x00000002, 0x11001100],
        };
        let encoded = packet.encode();

        assert_eq!(
            &encoded[..],
            &[
                22, 0, 0, 0, 6, 0, 0, 0,
                0x09, 0x10,
                7, 0, 0, 0,
                2, 0, 0, 0,
                0x00, 0x11, 0x00, 0x11,
            ]
        );
    }

    #[test]
    fn test_operation_request_zero_and_five_params() {
        for params in [vec![], vec![1, 2, 3, 4, 0xFFFF_FFFF]] {
            let packet = Packet::OperationRequest {
                code: 0x1001,
                transaction_id: 1,
                params,
            };
            assert_eq!(roundtrip(&packet), packet);
        }
    }

    #[test]
    fn test_operation_request_from_operation() {
        let op = Operation::with_params(0x101Au16, [0x00110011]).unwrap();
        let packet = Packet::operation_request(&op, 42);
        assert_eq!(packet.transaction_id(), Some(42));
        assert_eq!(packet.payload_size(), 10);
    }

    #[test]
    fn test_back_to_back_packets() {
        let packets = vec![
            Packet::InitCommandRequest(HostIdentity::new(GUID1, "mypc1", "1.0")),
            Packet::InitCommandAck {
                session_id: 0x00010203,
                identity: HostIdentity::new(GUID2, "mypc2", "1.1"),
            },
            Packet::InitEventAck,
            Packet::InitFail { error: 0x0a0b },
            Packet::OperationRequest {
                code: 0x1001,
                transaction_id: 0,
                params: vec![],
            },
        ];

        let mut buf = BytesMut::new();
        for packet in &packets {
            buf.extend_from_slice(&packet.encode());
        }

        for packet in &packets {
            assert_eq!(&Packet::decode(&mut buf).unwrap(), packet);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_stops_at_frame_boundary() {
        let mut buf = Packet::InitEventRequest { session_id: 5 }.encode();
        buf.extend_from_slice(&[0xDE, 0xAD]);

        let packet = Packet::decode(&mut buf).unwrap();
        assert_eq!(packet, Packet::InitEventRequest { session_id: 5 });
        assert_eq!(&buf[..], &[0xDE, 0xAD]);
    }

    #[test]
    fn test_declared_length_below_header() {
        let mut buf = BytesMut::from(&[7u8, 0, 0, 0, 4, 0, 0, 0][..]);
        let result = Packet::decode(&mut buf);
        assert!(matches!(result, Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_truncated_header() {
        let mut buf = BytesMut::from(&[8u8, 0, 0][..]);
        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let encoded = Packet::InitFail { error: 1 }.encode();
        let mut buf = BytesMut::from(&encoded[..encoded.len() - 1]);

        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
        // Nothing consumed on failure
        assert_eq!(buf.len(), encoded.len() - 1);
    }

    #[test]
    fn test_unknown_packet_type() {
        let mut buf = BytesMut::from(&[8u8, 0, 0, 0, 0x63, 0, 0, 0][..]);
        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_trailing_bytes_in_fixed_payload() {
        let mut buf = BytesMut::from(&[14u8, 0, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0, 0, 0][..]);
        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_too_many_params() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(8 + 6 + 24);
        buf.put_u32_le(6);
        buf.put_u16_le(0x1001);
        buf.put_u32_le(1);
        for i in 0..6 {
            buf.put_u32_le(i);
        }
        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_unterminated_string_reads_to_end() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(8 + 16 + 4);
        buf.put_u32_le(1);
        buf.put_slice(&GUID1);
        buf.put_u16_le(u16::from(b'h'));
        buf.put_u16_le(u16::from(b'i'));

        let packet = Packet::decode(&mut buf).unwrap();
        assert_eq!(
            packet,
            Packet::InitCommandRequest(HostIdentity::new(GUID1, "hi", ""))
        );
    }

    #[test]
    fn test_invalid_utf16() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(8 + 16 + 4);
        buf.put_u32_le(1);
        buf.put_slice(&GUID1);
        buf.put_u16_le(0xD800);
        buf.put_u16_le(0);

        assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_data_packets() {
        let start = Packet::StartData { transaction_id: 3, total_length: 5 };
        let end = Packet::EndData {
            transaction_id: 3,
            payload: Bytes::from_static(b"hello"),
        };
        assert_eq!(start.size(), 20);
        assert_eq!(roundtrip(&start), start);
        assert_eq!(roundtrip(&end), end);
    }

    #[test]
    fn test_display() {
        let packet = Packet::OperationResponse {
            code: 0x2001,
            transaction_id: 9,
            params: vec![],
        };
        assert_eq!(packet.to_string(), "Packet[OperationResponse](len=14, tx=9)");
    }

    fn arb_identity() -> impl Strategy<Value = HostIdentity> {
        (any::<[u8; 16]>(), "\\PC{0,24}", "\\PC{0,8}")
            .prop_map(|(guid, name, version)| HostIdentity::new(guid, name, version))
    }

    fn arb_params() -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(any::<u32>(), 0..=Packet::MAX_PARAMS)
    }

    fn arb_bytes() -> impl Strategy<Value = Bytes> {
        prop::collection::vec(any::<u8>(), 0..512).prop_map(Bytes::from)
    }

    fn arb_handshake_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![
            arb_identity().prop_map(Packet::InitCommandRequest),
            (any::<u32>(), arb_identity())
                .prop_map(|(session_id, identity)| Packet::InitCommandAck { session_id, identity }),
            any::<u32>().prop_map(|session_id| Packet::InitEventRequest { session_id }),
            Just(Packet::InitEventAck),
            any::<u32>().prop_map(|error| Packet::InitFail { error }),
            Just(Packet::ProbeRequest),
            Just(Packet::ProbeResponse),
        ]
    }

    fn arb_transaction_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![
            (any::<u16>(), any::<u32>(), arb_params()).prop_map(|(code, transaction_id, params)| {
                Packet::OperationRequest { code, transaction_id, params }
            }),
            (any::<u16>(), any::<u32>(), arb_params()).prop_map(|(code, transaction_id, params)| {
                Packet::OperationResponse { code, transaction_id, params }
            }),
            (any::<u16>(), any::<u32>(), arb_params()).prop_map(|(code, transaction_id, params)| {
                Packet::Event { code, transaction_id, params }
            }),
            (any::<u32>(), any::<u64>()).prop_map(|(transaction_id, total_length)| {
                Packet::StartData { transaction_id, total_length }
            }),
            (any::<u32>(), arb_bytes())
                .prop_map(|(transaction_id, payload)| Packet::Data { transaction_id, payload }),
            any::<u32>().prop_map(|transaction_id| Packet::Cancel { transaction_id }),
            (any::<u32>(), arb_bytes())
                .prop_map(|(transaction_id, payload)| Packet::EndData { transaction_id, payload }),
        ]
    }

    fn arb_packet() -> impl Strategy<Value = Packet> {
        prop_oneof![arb_handshake_packet(), arb_transaction_packet()]
    }

    proptest! {
        #[test]
        fn prop_encode_decode_roundtrip(packet in arb_packet()) {
            let mut encoded = packet.encode();
            prop_assert_eq!(encoded.len(), packet.size());

            let decoded = Packet::decode(&mut encoded).unwrap();
            prop_assert_eq!(&decoded, &packet);
            prop_assert!(encoded.is_empty());

            // Byte-for-byte stable
            prop_assert_eq!(decoded.encode(), packet.encode());
        }

        #[test]
        fn prop_truncated_frames_are_rejected(packet in arb_packet(), cut in 1usize..64) {
            let encoded = packet.encode();
            let keep = encoded.len().saturating_sub(cut);
            let mut buf = BytesMut::from(&encoded[..keep]);

            prop_assert!(matches!(Packet::decode(&mut buf), Err(Error::MalformedPacket(_))));
        }
    }
}
