//! Canon EOS event stream decoding
//!
//! EOS cameras deliver events in bulk as the data phase of `EosGetEvent`.
//! The buffer is a sequence of variable-length records:
//!
//! ```text
//! ┌─────────────┬─────────────┬──────────────────────────┐
//! │   Length    │    Code     │        Parameters        │
//! │   4 bytes   │   4 bytes   │  Length - 8 bytes        │
//! │  (LE u32)   │  (LE u32)   │  (up to 3 LE u32 values) │
//! └─────────────┴─────────────┴──────────────────────────┘
//! ```
//!
//! Records with an unknown event code are skipped. A record with a corrupt
//! length ends decoding, since the next record boundary cannot be found.

use std::fmt;
use std::iter::FusedIterator;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{trace, warn};

use crate::error::{Error, Result};

/// Canon EOS event codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventCode {
    RequestGetEvent = 0xC101,
    ObjectAddedEx = 0xC181,
    ObjectRemoved = 0xC182,
    RequestGetObjectInfoEx = 0xC183,
    StorageStatusChanged = 0xC184,
    StorageInfoChanged = 0xC185,
    RequestObjectTransfer = 0xC186,
    ObjectInfoChangedEx = 0xC187,
    ObjectContentChanged = 0xC188,
    PropValueChanged = 0xC189,
    AvailListChanged = 0xC18A,
    CameraStatusChanged = 0xC18B,
    WillSoonShutdown = 0xC18D,
    ShutdownTimerUpdated = 0xC18E,
    RequestCancelTransfer = 0xC18F,
    RequestObjectTransferDt = 0xC190,
    RequestCancelTransferDt = 0xC191,
    StoreAdded = 0xC192,
    StoreRemoved = 0xC193,
    BulbExposureTime = 0xC194,
    RecordingTime = 0xC195,
    RequestObjectTransferTs = 0xC1A2,
    AfResult = 0xC1A3,
}

impl EventCode {
    /// Get event name
    pub fn name(self) -> &'static str {
        match self {
            Self::RequestGetEvent => "EosEventRequestGetEvent",
            Self::ObjectAddedEx => "EosEventObjectAddedEx",
            Self::ObjectRemoved => "EosEventObjectRemoved",
            Self::RequestGetObjectInfoEx => "EosEventRequestGetObjectInfoEx",
            Self::StorageStatusChanged => "EosEventStorageStatusChanged",
            Self::StorageInfoChanged => "EosEventStorageInfoChanged",
            Self::RequestObjectTransfer => "EosEventRequestObjectTransfer",
            Self::ObjectInfoChangedEx => "EosEventObjectInfoChangedEx",
            Self::ObjectContentChanged => "EosEventObjectContentChanged",
            Self::PropValueChanged => "EosEventPropValueChanged",
            Self::AvailListChanged => "EosEventAvailListChanged",
            Self::CameraStatusChanged => "EosEventCameraStatusChanged",
            Self::WillSoonShutdown => "EosEventWillSoonShutdown",
            Self::ShutdownTimerUpdated => "EosEventShutdownTimerUpdated",
            Self::RequestCancelTransfer => "EosEventRequestCancelTransfer",
            Self::RequestObjectTransferDt => "EosEventRequestObjectTransferDT",
            Self::RequestCancelTransferDt => "EosEventRequestCancelTransferDT",
            Self::StoreAdded => "EosEventStoreAdded",
            Self::StoreRemoved => "EosEventStoreRemoved",
            Self::BulbExposureTime => "EosEventBulbExposureTime",
            Self::RecordingTime => "EosEventRecordingTime",
            Self::RequestObjectTransferTs => "EosEventRequestObjectTransferTS",
            Self::AfResult => "EosEventAfResult",
        }
    }
}

impl From<EventCode> for u32 {
    fn from(code: EventCode) -> u32 {
        code as u32
    }
}

impl TryFrom<u32> for EventCode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0xC101 => Ok(Self::RequestGetEvent),
            0xC181 => Ok(Self::ObjectAddedEx),
            0xC182 => Ok(Self::ObjectRemoved),
            0xC183 => Ok(Self::RequestGetObjectInfoEx),
            0xC184 => Ok(Self::StorageStatusChanged),
            0xC185 => Ok(Self::StorageInfoChanged),
            0xC186 => Ok(Self::RequestObjectTransfer),
            0xC187 => Ok(Self::ObjectInfoChangedEx),
            0xC188 => Ok(Self::ObjectContentChanged),
            0xC189 => Ok(Self::PropValueChanged),
            0xC18A => Ok(Self::AvailListChanged),
            0xC18B => Ok(Self::CameraStatusChanged),
            0xC18D => Ok(Self::WillSoonShutdown),
            0xC18E => Ok(Self::ShutdownTimerUpdated),
            0xC18F => Ok(Self::RequestCancelTransfer),
            0xC190 => Ok(Self::RequestObjectTransferDt),
            0xC191 => Ok(Self::RequestCancelTransferDt),
            0xC192 => Ok(Self::StoreAdded),
            0xC193 => Ok(Self::StoreRemoved),
            0xC194 => Ok(Self::BulbExposureTime),
            0xC195 => Ok(Self::RecordingTime),
            0xC1A2 => Ok(Self::RequestObjectTransferTs),
            0xC1A3 => Ok(Self::AfResult),
            _ => Err(Error::UnknownEvent(value)),
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), *self as u32)
    }
}

/// A decoded vendor event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event code
    pub code: EventCode,

    /// Up to [`Event::MAX_PARAMS`] parameters, in record order
    pub params: Vec<u32>,
}

impl Event {
    /// Maximum number of parameters decoded per record
    pub const MAX_PARAMS: usize = 3;

    /// Create an event
    pub fn new(code: EventCode, params: Vec<u32>) -> Self {
        Self { code, params }
    }

    /// Parameter at `index` (0-based)
    pub fn param(&self, index: usize) -> Option<u32> {
        self.params.get(index).copied()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:X?}", self.code, self.params)
    }
}

/// Outcome of decoding a single record
#[derive(Debug, Clone, PartialEq, Eq)]
enum Record {
    /// Known event; `length` bytes consumed
    Event { event: Event, length: usize },

    /// Unknown event code; `length` bytes to skip
    Skipped { code: u32, length: usize },

    /// Fewer than 8 bytes left
    End,
}

/// Record header size: length + code
const RECORD_HEADER_SIZE: usize = 8;

fn decode_record(buf: &[u8], offset: usize) -> Result<Record> {
    let rest = &buf[offset..];

    if rest.len() < RECORD_HEADER_SIZE {
        return Ok(Record::End);
    }

    let length = LittleEndian::read_u32(&rest[0..4]) as usize;
    let code = LittleEndian::read_u32(&rest[4..8]);

    if length < RECORD_HEADER_SIZE {
        return Err(Error::MalformedEvent {
            offset,
            reason: format!("record length {} is shorter than its header", length),
        });
    }

    if length > rest.len() {
        return Err(Error::MalformedEvent {
            offset,
            reason: format!(
                "record length {} exceeds the {} bytes left in the buffer",
                length,
                rest.len()
            ),
        });
    }

    let code = match EventCode::try_from(code) {
        Ok(code) => code,
        Err(_) => return Ok(Record::Skipped { code, length }),
    };

    let params = rest[RECORD_HEADER_SIZE..length]
        .chunks_exact(4)
        .take(Event::MAX_PARAMS)
        .map(LittleEndian::read_u32)
        .collect();

    Ok(Record::Event {
        event: Event::new(code, params),
        length,
    })
}

/// Lazy, single-pass parser over an event buffer
///
/// Yields known events in order, skips unknown ones, and yields at most one
/// [`Error::MalformedEvent`] before finishing.
///
/// # Examples
///
/// ```
/// use ptprust_core::event::{EventCode, EventParser};
///
/// let buf = [
///     16, 0, 0, 0, 0x89, 0xC1, 0, 0, // length, PropValueChanged
///     0x01, 0xD1, 0, 0, 0x1D, 0, 0, 0, // aperture, 29
/// ];
///
/// let events: Vec<_> = EventParser::new(&buf).collect::<Result<_, _>>().unwrap();
/// assert_eq!(events[0].code, EventCode::PropValueChanged);
/// assert_eq!(events[0].params, vec![0xD101, 29]);
/// ```
#[derive(Debug, Clone)]
pub struct EventParser<'a> {
    buf: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> EventParser<'a> {
    /// Create a parser over a buffer with any transport header already stripped
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            finished: false,
        }
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for EventParser<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match decode_record(self.buf, self.offset) {
                Ok(Record::Event { event, length }) => {
                    trace!(offset = self.offset, "Decoded event {}", event);
                    self.offset += length;
                    return Some(Ok(event));
                }
                Ok(Record::Skipped { code, length }) => {
                    trace!(
                        offset = self.offset,
                        length = length,
                        "Skipping unsupported event 0x{:04X}",
                        code
                    );
                    self.offset += length;
                }
                Ok(Record::End) => self.finished = true,
                Err(e) => {
                    warn!("Stopping event decoding: {}", e);
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        None
    }
}

impl FusedIterator for EventParser<'_> {}
