//! Advertised device capabilities

/// What a responder says it supports
///
/// Queried before issuing optional operations so that unsupported requests
/// fail locally instead of on the wire.
pub trait Capabilities: Send + Sync {
    /// Check if an operation code is advertised
    fn supports_operation(&self, code: u16) -> bool;

    /// Check if an event code is advertised
    fn supports_event(&self, code: u16) -> bool;

    /// Check if a device property code is advertised
    fn supports_property(&self, code: u16) -> bool;
}
