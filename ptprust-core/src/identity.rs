//! Host and responder identity exchanged during the PTP/IP handshake

use std::fmt;

/// 16-byte connection GUID
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Size on the wire
    pub const SIZE: usize = 16;

    /// Create a GUID from raw bytes
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Guid {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", hex::encode(self.0))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identity of one end of a PTP/IP connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostIdentity {
    /// Connection GUID
    pub guid: Guid,

    /// Friendly host name
    pub name: String,

    /// Protocol/software version string
    pub version: String,
}

impl HostIdentity {
    /// Create a new identity
    ///
    /// Strings are null terminated on the wire, so each is cut at its first
    /// U+0000.
    pub fn new(guid: impl Into<Guid>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: until_nul(name.into()),
            version: until_nul(version.into()),
        }
    }
}

fn until_nul(mut s: String) -> String {
    if let Some(end) = s.find('\0') {
        s.truncate(end);
    }
    s
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} [{}]", self.name, self.version, self.guid)
    }
}
