//! DevicePropDesc dataset

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    error::{Error, Result},
    reader::DatasetRead,
};

/// PTP data type codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Array(ScalarType),
    String,
}

/// Element type of an array data type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl ScalarType {
    fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(Self::Int8),
            0x0002 => Some(Self::UInt8),
            0x0003 => Some(Self::Int16),
            0x0004 => Some(Self::UInt16),
            0x0005 => Some(Self::Int32),
            0x0006 => Some(Self::UInt32),
            0x0007 => Some(Self::Int64),
            0x0008 => Some(Self::UInt64),
            _ => None,
        }
    }

    fn read<R: Read>(self, r: &mut R) -> Result<PropValue> {
        Ok(match self {
            Self::Int8 => PropValue::Int8(r.read_i8()?),
            Self::UInt8 => PropValue::UInt8(r.read_u8()?),
            Self::Int16 => PropValue::Int16(r.read_i16::<LittleEndian>()?),
            Self::UInt16 => PropValue::UInt16(r.read_u16::<LittleEndian>()?),
            Self::Int32 => PropValue::Int32(r.read_i32::<LittleEndian>()?),
            Self::UInt32 => PropValue::UInt32(r.read_u32::<LittleEndian>()?),
            Self::Int64 => PropValue::Int64(r.read_i64::<LittleEndian>()?),
            Self::UInt64 => PropValue::UInt64(r.read_u64::<LittleEndian>()?),
        })
    }
}

impl DataType {
    /// Bit marking an array of the element type
    pub const ARRAY_FLAG: u16 = 0x4000;

    /// String type code
    pub const STRING_CODE: u16 = 0xFFFF;

    /// Read one value of this type
    pub fn read_value<R: Read>(self, r: &mut R) -> Result<PropValue> {
        match self {
            Self::Int8 => ScalarType::Int8.read(r),
            Self::UInt8 => ScalarType::UInt8.read(r),
            Self::Int16 => ScalarType::Int16.read(r),
            Self::UInt16 => ScalarType::UInt16.read(r),
            Self::Int32 => ScalarType::Int32.read(r),
            Self::UInt32 => ScalarType::UInt32.read(r),
            Self::Int64 => ScalarType::Int64.read(r),
            Self::UInt64 => ScalarType::UInt64.read(r),
            Self::Array(element) => {
                let count = r.read_ptp_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(element.read(r)?);
                }
                Ok(PropValue::Array(items))
            }
            Self::String => Ok(PropValue::String(r.read_ptp_string()?)),
        }
    }
}

impl TryFrom<u16> for DataType {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        if code == Self::STRING_CODE {
            return Ok(Self::String);
        }

        let scalar = ScalarType::from_code(code & !Self::ARRAY_FLAG)
            .ok_or(Error::UnsupportedDataType(code))?;

        if code & Self::ARRAY_FLAG != 0 {
            return Ok(Self::Array(scalar));
        }

        Ok(match scalar {
            ScalarType::Int8 => Self::Int8,
            ScalarType::UInt8 => Self::UInt8,
            ScalarType::Int16 => Self::Int16,
            ScalarType::UInt16 => Self::UInt16,
            ScalarType::Int32 => Self::Int32,
            ScalarType::UInt32 => Self::UInt32,
            ScalarType::Int64 => Self::Int64,
            ScalarType::UInt64 => Self::UInt64,
        })
    }
}

/// A typed property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Array(Vec<PropValue>),
    String(String),
}

impl PropValue {
    /// Integer value widened to i128, if this is a scalar
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::Int8(v) => Some(v.into()),
            Self::UInt8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::UInt16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::UInt32(v) => Some(v.into()),
            Self::Int64(v) => Some(v.into()),
            Self::UInt64(v) => Some(v.into()),
            Self::Array(_) | Self::String(_) => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::String(s) => write!(f, "{:?}", s),
            other => match other.as_integer() {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            },
        }
    }
}

/// Allowed values of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropForm {
    None,
    Range {
        min: PropValue,
        max: PropValue,
        step: PropValue,
    },
    Enumeration(Vec<PropValue>),
}

/// Device property description returned by GetDevicePropDesc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePropDesc {
    pub code: u16,
    pub data_type: DataType,

    /// Whether the initiator may set the property
    pub writable: bool,

    pub factory_default: PropValue,
    pub current: PropValue,
    pub form: PropForm,
}

impl DevicePropDesc {
    const FORM_NONE: u8 = 0;
    const FORM_RANGE: u8 = 1;
    const FORM_ENUMERATION: u8 = 2;

    /// Decode the dataset
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let code = cursor.read_ptp_u16()?;
        let data_type = DataType::try_from(cursor.read_ptp_u16()?)?;
        let writable = match cursor.read_ptp_u8()? {
            0 => false,
            1 => true,
            other => return Err(Error::Parse(format!("invalid get/set flag {}", other))),
        };
        let factory_default = data_type.read_value(&mut cursor)?;
        let current = data_type.read_value(&mut cursor)?;

        let form = match cursor.read_ptp_u8()? {
            Self::FORM_NONE => PropForm::None,
            Self::FORM_RANGE => PropForm::Range {
                min: data_type.read_value(&mut cursor)?,
                max: data_type.read_value(&mut cursor)?,
                step: data_type.read_value(&mut cursor)?,
            },
            Self::FORM_ENUMERATION => {
                let count = cursor.read_ptp_u16()?;
                let values = (0..count)
                    .map(|_| data_type.read_value(&mut cursor))
                    .collect::<Result<Vec<_>>>()?;
                PropForm::Enumeration(values)
            }
            other => return Err(Error::Parse(format!("unknown form flag {}", other))),
        };

        Ok(Self {
            code,
            data_type,
            writable,
            factory_default,
            current,
            form,
        })
    }
}

impl fmt::Display for DevicePropDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property[0x{:04X}, {:?}, current: {}{}]",
            self.code,
            self.data_type,
            self.current,
            if self.writable { ", rw" } else { ", ro" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_support::put_string;
    use pretty_assertions::assert_eq;

    fn header(buf: &mut Vec<u8>, code: u16, data_type: u16, writable: u8) {
        buf.extend_from_slice(&code.to_le_bytes());
        buf.extend_from_slice(&data_type.to_le_bytes());
        buf.push(writable);
    }

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::try_from(0x0004).unwrap(), DataType::UInt16);
        assert_eq!(
            DataType::try_from(0x4006).unwrap(),
            DataType::Array(ScalarType::UInt32)
        );
        assert_eq!(DataType::try_from(0xFFFF).unwrap(), DataType::String);
        assert!(matches!(
            DataType::try_from(0x0009),
            Err(Error::UnsupportedDataType(0x0009))
        ));
    }

    #[test]
    fn test_parse_enumeration() {
        let mut buf = Vec::new();
        header(&mut buf, 0xD103, 0x0004, 1);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0x68u16.to_le_bytes());
        buf.push(2);
        buf.extend_from_slice(&3u16.to_le_bytes());
        for v in [0x48u16, 0x50, 0x68] {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        let desc = DevicePropDesc::parse(&buf).unwrap();

        assert_eq!(desc.code, 0xD103);
        assert_eq!(desc.data_type, DataType::UInt16);
        assert!(desc.writable);
        assert_eq!(desc.current, PropValue::UInt16(0x68));
        assert_eq!(
            desc.form,
            PropForm::Enumeration(vec![
                PropValue::UInt16(0x48),
                PropValue::UInt16(0x50),
                PropValue::UInt16(0x68),
            ])
        );
    }

    #[test]
    fn test_parse_range() {
        let mut buf = Vec::new();
        header(&mut buf, 0x5001, 0x0002, 0);
        buf.extend_from_slice(&[100, 55, 1, 0, 100, 1]);

        let desc = DevicePropDesc::parse(&buf).unwrap();

        assert!(!desc.writable);
        assert_eq!(
            desc.form,
            PropForm::Range {
                min: PropValue::UInt8(0),
                max: PropValue::UInt8(100),
                step: PropValue::UInt8(1),
            }
        );
        assert_eq!(desc.current.as_integer(), Some(55));
    }

    #[test]
    fn test_parse_string_property() {
        let mut buf = Vec::new();
        header(&mut buf, 0xD402, 0xFFFF, 0);
        put_string(&mut buf, "");
        put_string(&mut buf, "EOS");
        buf.push(0);

        let desc = DevicePropDesc::parse(&buf).unwrap();

        assert_eq!(desc.current, PropValue::String("EOS".into()));
        assert_eq!(desc.form, PropForm::None);
        assert_eq!(desc.to_string(), "Property[0xD402, String, current: \"EOS\", ro]");
    }

    #[test]
    fn test_parse_array_property() {
        let mut buf = Vec::new();
        header(&mut buf, 0xD1A0, 0x4004, 0);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[1, 0, 2, 0]);
        buf.push(0);

        let desc = DevicePropDesc::parse(&buf).unwrap();

        assert_eq!(desc.factory_default, PropValue::Array(vec![]));
        assert_eq!(
            desc.current,
            PropValue::Array(vec![PropValue::UInt16(1), PropValue::UInt16(2)])
        );
        assert_eq!(desc.current.to_string(), "[1, 2]");
    }

    #[test]
    fn test_parse_unknown_form() {
        let mut buf = Vec::new();
        header(&mut buf, 0xD101, 0x0002, 1);
        buf.extend_from_slice(&[0, 0, 9]);

        assert!(matches!(DevicePropDesc::parse(&buf), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_truncated() {
        let mut buf = Vec::new();
        header(&mut buf, 0xD101, 0x0006, 1);
        buf.extend_from_slice(&[0, 0]);

        assert!(matches!(DevicePropDesc::parse(&buf), Err(Error::Truncated(_))));
    }
}
