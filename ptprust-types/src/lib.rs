//! PTP dataset types for ptprust

pub mod capabilities;
pub mod device_info;
pub mod error;
pub mod prop_desc;
pub mod reader;

pub use capabilities::Capabilities;
pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use prop_desc::{DataType, DevicePropDesc, PropForm, PropValue, ScalarType};
