use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dataset ended before a field was complete
    #[error("Truncated dataset: {0}")]
    Truncated(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported data type: 0x{0:04X}")]
    UnsupportedDataType(u16),
}
