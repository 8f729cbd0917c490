//! DeviceInfo dataset

use std::fmt;
use std::io::Cursor;

use crate::{capabilities::Capabilities, error::Result, reader::DatasetRead};

/// Device information returned by GetDeviceInfo
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// PTP version times 100
    pub standard_version: u16,

    pub vendor_extension_id: u32,
    pub vendor_extension_version: u16,
    pub vendor_extension_desc: String,

    pub functional_mode: u16,

    pub operations_supported: Vec<u16>,
    pub events_supported: Vec<u16>,
    pub device_properties_supported: Vec<u16>,
    pub capture_formats: Vec<u16>,
    pub image_formats: Vec<u16>,

    pub manufacturer: String,
    pub model: String,
    pub device_version: String,
    pub serial_number: String,
}

impl DeviceInfo {
    /// Decode the dataset
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        Ok(Self {
            standard_version: cursor.read_ptp_u16()?,
            vendor_extension_id: cursor.read_ptp_u32()?,
            vendor_extension_version: cursor.read_ptp_u16()?,
            vendor_extension_desc: cursor.read_ptp_string()?,
            functional_mode: cursor.read_ptp_u16()?,
            operations_supported: cursor.read_u16_array()?,
            events_supported: cursor.read_u16_array()?,
            device_properties_supported: cursor.read_u16_array()?,
            capture_formats: cursor.read_u16_array()?,
            image_formats: cursor.read_u16_array()?,
            manufacturer: cursor.read_ptp_string()?,
            model: cursor.read_ptp_string()?,
            device_version: cursor.read_ptp_string()?,
            serial_number: cursor.read_ptp_string()?,
        })
    }
}

impl Capabilities for DeviceInfo {
    fn supports_operation(&self, code: u16) -> bool {
        self.operations_supported.contains(&code)
    }

    fn supports_event(&self, code: u16) -> bool {
        self.events_supported.contains(&code)
    }

    fn supports_property(&self, code: u16) -> bool {
        self.device_properties_supported.contains(&code)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[{} {}, SN: {}, FW: {}]",
            self.manufacturer, self.model, self.serial_number, self.device_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, reader::test_support::*};
    use pretty_assertions::assert_eq;

    fn sample_dataset() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u16.to_le_bytes());
        buf.extend_from_slice(&11u32.to_le_bytes());
        buf.extend_from_slice(&100u16.to_le_bytes());
        put_string(&mut buf, "");
        buf.extend_from_slice(&0u16.to_le_bytes());
        put_u16_array(&mut buf, &[0x1001, 0x1002, 0x1014, 0x910F]);
        put_u16_array(&mut buf, &[0x4002]);
        put_u16_array(&mut buf, &[0xD101, 0xD102]);
        put_u16_array(&mut buf, &[]);
        put_u16_array(&mut buf, &[0x3801]);
        put_string(&mut buf, "Canon Inc.");
        put_string(&mut buf, "Canon EOS 5D Mark III");
        put_string(&mut buf, "3-1.2.3");
        put_string(&mut buf, "0123456789");
        buf
    }

    #[test]
    fn test_parse_device_info() {
        let info = DeviceInfo::parse(&sample_dataset()).unwrap();

        assert_eq!(info.standard_version, 100);
        assert_eq!(info.vendor_extension_id, 11);
        assert_eq!(info.operations_supported, vec![0x1001, 0x1002, 0x1014, 0x910F]);
        assert_eq!(info.capture_formats, Vec::<u16>::new());
        assert_eq!(info.manufacturer, "Canon Inc.");
        assert_eq!(info.model, "Canon EOS 5D Mark III");
        assert_eq!(info.serial_number, "0123456789");
    }

    #[test]
    fn test_device_info_capabilities() {
        let info = DeviceInfo::parse(&sample_dataset()).unwrap();

        assert!(info.supports_operation(0x910F));
        assert!(!info.supports_operation(0x9116));
        assert!(info.supports_event(0x4002));
        assert!(info.supports_property(0xD102));
        assert!(!info.supports_property(0xD103));
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::parse(&sample_dataset()).unwrap();
        assert_eq!(
            info.to_string(),
            "Device[Canon Inc. Canon EOS 5D Mark III, SN: 0123456789, FW: 3-1.2.3]"
        );
    }

    #[test]
    fn test_truncated_device_info() {
        let data = sample_dataset();
        let result = DeviceInfo::parse(&data[..data.len() - 3]);
        assert!(matches!(result, Err(Error::Truncated(_))));
    }
}
