//! Primitive readers for PTP datasets
//!
//! Datasets are little-endian. Strings are a u8 character count (including
//! the terminating null, 0 for an empty string) followed by UTF-16LE code
//! units. Arrays are a u32 element count followed by the elements.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Dataset field readers over any byte source
pub trait DatasetRead: Read {
    fn read_ptp_u8(&mut self) -> Result<u8> {
        Ok(self.read_u8()?)
    }

    fn read_ptp_u16(&mut self) -> Result<u16> {
        Ok(self.read_u16::<LittleEndian>()?)
    }

    fn read_ptp_u32(&mut self) -> Result<u32> {
        Ok(self.read_u32::<LittleEndian>()?)
    }

    fn read_ptp_string(&mut self) -> Result<String> {
        let count = self.read_u8()? as usize;
        if count == 0 {
            return Ok(String::new());
        }

        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(self.read_u16::<LittleEndian>()?);
        }

        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        String::from_utf16(&units[..end])
            .map_err(|e| Error::Parse(format!("invalid UTF-16 string: {}", e)))
    }

    fn read_u16_array(&mut self) -> Result<Vec<u16>> {
        let count = self.read_u32::<LittleEndian>()? as usize;
        // Capacity is capped: the count comes off the wire
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_u16::<LittleEndian>()?);
        }
        Ok(items)
    }
}

impl<R: Read + ?Sized> DatasetRead for R {}

#[cfg(test)]
pub(crate) mod test_support {
    //! Dataset builders shared by the dataset tests

    pub fn put_string(buf: &mut Vec<u8>, s: &str) {
        if s.is_empty() {
            buf.push(0);
            return;
        }
        let units: Vec<u16> = s.encode_utf16().collect();
        buf.push(units.len() as u8 + 1);
        for unit in units {
            buf.extend_from_slice(&unit.to_le_bytes());
        }
        buf.extend_from_slice(&[0, 0]);
    }

    pub fn put_u16_array(buf: &mut Vec<u8>, items: &[u16]) {
        buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
        for item in items {
            buf.extend_from_slice(&item.to_le_bytes());
        }
    }
}
