//! High-level initiator interface

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use ptprust_core::{
    DEFAULT_PORT, Event, EventParser, HostIdentity, Operation, OperationCode, Response,
    constants::{event_mode, release_result, remote_mode},
};
use ptprust_transport::{TcpTransport, Transport};
use ptprust_types::{Capabilities, DeviceInfo, DevicePropDesc};

use crate::{
    engine::TransactionEngine,
    error::{Error, Result},
    framing::{Framing, IpFraming},
    handshake,
};

/// PTP initiator with Canon EOS extensions
///
/// # Examples
///
/// ```no_run
/// use ptprust::{HostIdentity, Initiator};
///
/// #[tokio::main]
/// async fn main() -> ptprust::Result<()> {
///     let host = HostIdentity::new([0x42; 16], "ptprust", "1.0");
///     let mut camera = Initiator::connect_ip("192.168.1.2", 15740, &host).await?;
///
///     camera.open_session(1).await?;
///     let info = camera.get_device_info().await?;
///     println!("Camera: {}", info);
///
///     for event in camera.check_events().await? {
///         println!("{}", event);
///     }
///
///     camera.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Initiator<T = TcpTransport, F = IpFraming> {
    engine: TransactionEngine<T, F>,
    event_channel: Option<T>,
    capabilities: Option<Box<dyn Capabilities>>,
    responder: Option<HostIdentity>,
}

impl Initiator<TcpTransport, IpFraming> {
    /// Connect to a PTP/IP responder
    ///
    /// Opens the command and event channels and runs the PTP/IP handshake on
    /// both. No session is opened.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - either channel cannot be connected
    /// - the responder refuses the connection ([`Error::InitFailed`])
    /// - the responder answers out of protocol
    pub async fn connect_ip(
        host: impl Into<String>,
        port: u16,
        identity: &HostIdentity,
    ) -> Result<Self> {
        let host = host.into();
        let timeout = Duration::from_secs(ptprust_core::constants::DEFAULT_TIMEOUT);

        let mut command = TcpTransport::new(host.clone(), port).with_connect_timeout(timeout);
        info!("Connecting to {}...", command.remote_addr());
        command.connect().await?;

        let connection = handshake::init_command_channel(&mut command, identity, timeout).await?;

        let mut event = TcpTransport::new(host, port).with_connect_timeout(timeout);
        event.connect().await?;
        handshake::init_event_channel(&mut event, connection.connection_number, timeout).await?;

        info!(
            "Connected to {} (connection {})",
            connection.responder, connection.connection_number
        );

        let mut initiator = Self::new(command, IpFraming::new()).with_event_channel(event);
        initiator.responder = Some(connection.responder);
        Ok(initiator)
    }

    /// Connect to a PTP/IP responder on the default port
    pub async fn connect_ip_default(host: impl Into<String>, identity: &HostIdentity) -> Result<Self> {
        Self::connect_ip(host, DEFAULT_PORT, identity).await
    }
}

impl<T: Transport, F: Framing> Initiator<T, F> {
    /// Create an initiator over a connected channel
    pub fn new(transport: T, framing: F) -> Self {
        Self {
            engine: TransactionEngine::new(transport, framing),
            event_channel: None,
            capabilities: None,
            responder: None,
        }
    }

    /// Set per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.with_timeout(timeout);
        self
    }

    /// Use a known capability set for operation preflight
    pub fn with_capabilities(mut self, capabilities: impl Capabilities + 'static) -> Self {
        self.capabilities = Some(Box::new(capabilities));
        self
    }

    /// Attach the channel the responder sends asynchronous events on
    pub fn with_event_channel(mut self, transport: T) -> Self {
        self.event_channel = Some(transport);
        self
    }

    pub fn engine(&self) -> &TransactionEngine<T, F> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TransactionEngine<T, F> {
        &mut self.engine
    }

    /// Identity announced by the responder during the handshake
    pub fn responder(&self) -> Option<&HostIdentity> {
        self.responder.as_ref()
    }

    /// Check if a session is open on a connected channel
    pub fn is_connected(&self) -> bool {
        self.engine.is_open() && self.engine.transport().is_connected()
    }

    /// Open a session
    pub async fn open_session(&mut self, session_id: u32) -> Result<()> {
        let response = self.engine.open_session(session_id).await?;
        check_response(response)?;
        Ok(())
    }

    /// Close the session
    pub async fn close_session(&mut self) -> Result<()> {
        let response = self.engine.close_session().await?;
        check_response(response)?;
        Ok(())
    }

    /// Get device information
    ///
    /// The result becomes the capability set used for preflight checks.
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        debug!("Getting device info...");

        let operation = Operation::new(OperationCode::GetDeviceInfo);
        let (data, response) = self.engine.transact_receive_data(&operation).await?;
        check_response(response)?;

        let info = DeviceInfo::parse(&data)?;
        debug!("Device info: {}", info);

        self.capabilities = Some(Box::new(info.clone()));
        Ok(info)
    }

    /// Get the description of a device property
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedOperation`] if GetDevicePropDesc is not advertised
    /// - [`Error::UnsupportedProperty`] if `code` is not advertised
    /// - [`Error::Device`] on a non-OK response
    pub async fn get_device_prop_desc(&mut self, code: u16) -> Result<DevicePropDesc> {
        self.require_operation(OperationCode::GetDevicePropDesc)?;
        self.require_property(code)?;

        let operation = Operation::with_params(OperationCode::GetDevicePropDesc, [code as u32])?;
        let (data, response) = self.engine.transact_receive_data(&operation).await?;
        check_response(response)?;

        let desc = DevicePropDesc::parse(&data)?;
        debug!("{}", desc);

        Ok(desc)
    }

    /// Fetch pending vendor events
    ///
    /// Unknown events are skipped. A corrupt record ends the batch and the
    /// events decoded before it are returned.
    pub async fn check_events(&mut self) -> Result<Vec<Event>> {
        let mode = Operation::with_params(OperationCode::EosSetEventMode, [event_mode::ON])?;
        check_response(self.engine.transact_no_data(&mode).await?)?;

        let operation = Operation::new(OperationCode::EosGetEvent);
        let (data, response) = self.engine.transact_receive_data(&operation).await?;
        check_response(response)?;

        let events: Vec<Event> = EventParser::new(&data).map_while(|event| event.ok()).collect();

        debug!("Received {} events in {} bytes", events.len(), data.len());

        Ok(events)
    }

    /// Trigger a capture on an EOS camera
    ///
    /// Puts the camera in remote mode, drains pending events, then releases
    /// the shutter.
    pub async fn initiate_capture(&mut self, storage_id: u32, format_code: u16) -> Result<()> {
        self.require_operation(OperationCode::EosRemoteRelease)?;

        debug!(
            "Initiating capture (storage=0x{:08X}, format=0x{:04X})",
            storage_id, format_code
        );

        let remote = Operation::with_params(OperationCode::EosSetRemoteMode, [remote_mode::ON])?;
        check_response(self.engine.transact_no_data(&remote).await?)?;

        self.check_events().await?;

        let release = Operation::new(OperationCode::EosRemoteRelease);
        let response = self.engine.transact_no_data(&release).await?;

        match response.code {
            _ if response.is_ok() => {
                info!("Shutter released");
                Ok(())
            }
            release_result::NO_FOCUS => Err(Error::NoFocus),
            release_result::STORAGE_FULL => Err(Error::StorageFull),
            _ => Err(device_error(response)),
        }
    }

    /// Read part of an object
    pub async fn get_partial_object(&mut self, object_id: u32, offset: u32, size: u32) -> Result<Bytes> {
        let operation = Operation::with_params(
            OperationCode::EosGetPartialObject,
            [object_id, offset, size],
        )?;
        let (data, response) = self.engine.transact_receive_data(&operation).await?;
        check_response(response)?;

        Ok(data)
    }

    /// Tell the camera an object transfer is finished
    pub async fn transfer_complete(&mut self, object_id: u32) -> Result<()> {
        let operation = Operation::with_params(OperationCode::EosTransferComplete, [object_id])?;
        check_response(self.engine.transact_no_data(&operation).await?)?;
        Ok(())
    }

    /// Close the session if open and disconnect all channels
    pub async fn disconnect(&mut self) -> Result<()> {
        info!("Disconnecting from {}...", self.engine.transport().remote_addr());

        if self.engine.is_open() {
            if let Err(e) = self.close_session().await {
                warn!("Failed to close session: {}", e);
            }
        }

        if let Some(mut event) = self.event_channel.take() {
            if let Err(e) = event.disconnect().await {
                warn!("Failed to close event channel: {}", e);
            }
        }

        self.engine.transport_mut().disconnect().await?;

        info!("Disconnected");
        Ok(())
    }

    // Helper methods

    fn require_operation(&self, code: OperationCode) -> Result<()> {
        match &self.capabilities {
            Some(caps) if !caps.supports_operation(code.into()) => {
                Err(Error::UnsupportedOperation(code.into()))
            }
            _ => Ok(()),
        }
    }

    fn require_property(&self, code: u16) -> Result<()> {
        match &self.capabilities {
            Some(caps) if !caps.supports_property(code) => Err(Error::UnsupportedProperty(code)),
            _ => Ok(()),
        }
    }
}

fn device_error(response: Response) -> Error {
    Error::Device {
        code: response.code,
        params: response.params,
    }
}

fn check_response(response: Response) -> Result<Response> {
    if response.is_ok() {
        Ok(response)
    } else {
        Err(device_error(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::UsbFraming;
    use mockall::{mock, predicate::eq};
    use pretty_assertions::assert_eq;
    use ptprust_core::{Container, EventCode, constants::eos_props};
    use ptprust_transport::MemoryTransport;

    mock! {
        pub Caps {}

        impl Capabilities for Caps {
            fn supports_operation(&self, code: u16) -> bool;
            fn supports_event(&self, code: u16) -> bool;
            fn supports_property(&self, code: u16) -> bool;
        }
    }

    fn response(code: u16, transaction_id: u32) -> Container {
        Container::response(code, transaction_id, &[])
    }

    fn event_record(code: u32, params: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(8 + 4 * params.len() as u32).to_le_bytes());
        buf.extend_from_slice(&code.to_le_bytes());
        for param in params {
            buf.extend_from_slice(&param.to_le_bytes());
        }
        buf
    }

    /// Initiator over USB framing with session 1 open and `frames` queued
    async fn open_initiator(frames: &[Container]) -> Initiator<MemoryTransport, UsbFraming> {
        let mut transport = MemoryTransport::with_inbound(response(0x2001, 0).encode());
        for frame in frames {
            transport.push_inbound(frame.encode());
        }

        let mut initiator = Initiator::new(transport, UsbFraming::new());
        initiator.open_session(1).await.unwrap();
        initiator.engine_mut().transport_mut().take_outbound();
        initiator
    }

    fn sent_codes(initiator: &mut Initiator<MemoryTransport, UsbFraming>) -> Vec<u16> {
        let mut written = initiator.engine_mut().transport_mut().take_outbound();
        let mut codes = Vec::new();
        while !written.is_empty() {
            codes.push(Container::decode(&mut written).unwrap().code);
        }
        codes
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let mut initiator = Initiator::new(MemoryTransport::new(), UsbFraming::new());

        assert!(matches!(initiator.check_events().await, Err(Error::NotConnected)));
        assert!(matches!(
            initiator.get_partial_object(1, 0, 16).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(initiator.transfer_complete(1).await, Err(Error::NotConnected)));
        assert!(initiator.engine().transport().outbound().is_empty());
    }

    #[tokio::test]
    async fn test_open_session_refused() {
        let transport = MemoryTransport::with_inbound(response(0x201E, 0).encode());
        let mut initiator = Initiator::new(transport, UsbFraming::new());

        let result = initiator.open_session(1).await;

        assert!(matches!(result, Err(Error::Device { code: 0x201E, .. })));
        assert!(!initiator.is_connected());
    }

    #[tokio::test]
    async fn test_check_events() {
        let mut payload = event_record(0xC1FF, &[1]);
        payload.extend(event_record(0xC189, &[eos_props::APERTURE as u32, 0x1D]));
        payload.extend(event_record(0xC18B, &[1]));
        payload.extend_from_slice(&[0, 0, 0, 0]);

        let mut initiator = open_initiator(&[
            response(0x2001, 1),
            Container::data(0x9116, 2, payload),
            response(0x2001, 2),
        ])
        .await;

        let events = initiator.check_events().await.unwrap();

        assert_eq!(
            events,
            vec![
                Event::new(EventCode::PropValueChanged, vec![0xD101, 29]),
                Event::new(EventCode::CameraStatusChanged, vec![1]),
            ]
        );
        assert_eq!(sent_codes(&mut initiator), vec![0x9115, 0x9116]);
    }

    #[tokio::test]
    async fn test_check_events_stops_at_corrupt_record() {
        let mut payload = event_record(0xC18E, &[5]);
        payload.extend_from_slice(&[2, 0, 0, 0, 0x89, 0xC1, 0, 0]);
        payload.extend(event_record(0xC18E, &[6]));

        let mut initiator = open_initiator(&[
            response(0x2001, 1),
            Container::data(0x9116, 2, payload),
            response(0x2001, 2),
        ])
        .await;

        let events = initiator.check_events().await.unwrap();

        assert_eq!(
            events,
            vec![Event::new(EventCode::ShutdownTimerUpdated, vec![5])]
        );
        assert!(initiator.is_connected());
    }

    #[tokio::test]
    async fn test_check_events_mode_refused() {
        let mut initiator = open_initiator(&[response(0x2019, 1)]).await;

        let result = initiator.check_events().await;

        assert!(matches!(result, Err(Error::Device { code: 0x2019, .. })));
        assert_eq!(sent_codes(&mut initiator), vec![0x9115]);
    }

    #[tokio::test]
    async fn test_initiate_capture_unsupported() {
        let mut caps = MockCaps::new();
        caps.expect_supports_operation()
            .with(eq(0x910F))
            .return_const(false);

        let mut initiator = open_initiator(&[]).await.with_capabilities(caps);

        let result = initiator.initiate_capture(0, 0).await;

        assert!(matches!(result, Err(Error::UnsupportedOperation(0x910F))));
        assert!(initiator.engine().transport().outbound().is_empty());
    }

    async fn capture_with_release_code(code: u16) -> Result<()> {
        let mut caps = MockCaps::new();
        caps.expect_supports_operation().return_const(true);

        let mut initiator = open_initiator(&[
            response(0x2001, 1),
            response(0x2001, 2),
            Container::data(0x9116, 3, Vec::<u8>::new()),
            response(0x2001, 3),
            response(code, 4),
        ])
        .await
        .with_capabilities(caps);

        let result = initiator.initiate_capture(0x00010001, 0x3801).await;
        assert_eq!(sent_codes(&mut initiator), vec![0x9114, 0x9115, 0x9116, 0x910F]);
        result
    }

    #[tokio::test]
    async fn test_initiate_capture() {
        capture_with_release_code(0x2001).await.unwrap();
    }

    #[tokio::test]
    async fn test_initiate_capture_no_focus() {
        let result = capture_with_release_code(1).await;
        assert!(matches!(result, Err(Error::NoFocus)));
    }

    #[tokio::test]
    async fn test_initiate_capture_storage_full() {
        let result = capture_with_release_code(7).await;
        assert!(matches!(result, Err(Error::StorageFull)));
    }

    #[tokio::test]
    async fn test_initiate_capture_other_failure() {
        let result = capture_with_release_code(0x2019).await;
        assert!(matches!(result, Err(Error::Device { code: 0x2019, .. })));
    }

    #[tokio::test]
    async fn test_get_device_prop_desc_unsupported_property() {
        let mut caps = MockCaps::new();
        caps.expect_supports_operation()
            .with(eq(0x1014))
            .return_const(true);
        caps.expect_supports_property()
            .with(eq(eos_props::ISO_SPEED))
            .return_const(false);

        let mut initiator = open_initiator(&[]).await.with_capabilities(caps);

        let result = initiator.get_device_prop_desc(eos_props::ISO_SPEED).await;

        assert!(matches!(result, Err(Error::UnsupportedProperty(0xD103))));
        assert!(initiator.engine().transport().outbound().is_empty());
    }

    #[tokio::test]
    async fn test_get_device_prop_desc_unsupported_operation() {
        let mut caps = MockCaps::new();
        caps.expect_supports_operation().return_const(false);

        let mut initiator = open_initiator(&[]).await.with_capabilities(caps);

        let result = initiator.get_device_prop_desc(eos_props::APERTURE).await;

        assert!(matches!(result, Err(Error::UnsupportedOperation(0x1014))));
    }

    #[tokio::test]
    async fn test_get_device_prop_desc() {
        let mut dataset = Vec::new();
        dataset.extend_from_slice(&0xD103u16.to_le_bytes());
        dataset.extend_from_slice(&0x0004u16.to_le_bytes());
        dataset.push(1);
        dataset.extend_from_slice(&0u16.to_le_bytes());
        dataset.extend_from_slice(&0x48u16.to_le_bytes());
        dataset.push(0);

        let mut initiator = open_initiator(&[
            Container::data(0x1014, 1, dataset),
            response(0x2001, 1),
        ])
        .await;

        let desc = initiator.get_device_prop_desc(0xD103).await.unwrap();

        assert_eq!(desc.code, 0xD103);
        assert_eq!(desc.current, ptprust_types::PropValue::UInt16(0x48));
    }

    #[tokio::test]
    async fn test_get_partial_object() {
        let mut initiator = open_initiator(&[
            Container::data(0x9107, 1, vec![0xFF, 0xD8, 0xFF]),
            response(0x2001, 1),
        ])
        .await;

        let data = initiator.get_partial_object(0x9001, 0, 3).await.unwrap();

        assert_eq!(&data[..], &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_transfer_complete_refused() {
        let mut initiator = open_initiator(&[response(0x2009, 1)]).await;

        let result = initiator.transfer_complete(0x9001).await;

        assert!(matches!(result, Err(Error::Device { code: 0x2009, .. })));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut initiator = open_initiator(&[response(0x2001, 1)]).await;

        initiator.disconnect().await.unwrap();

        assert!(!initiator.is_connected());
        assert!(!initiator.engine().transport().is_connected());
        assert_eq!(sent_codes(&mut initiator), vec![0x1003]);
    }

    #[tokio::test]
    async fn test_disconnect_without_session() {
        let mut initiator = Initiator::new(MemoryTransport::new(), UsbFraming::new());

        initiator.disconnect().await.unwrap();

        assert!(initiator.engine().transport().outbound().is_empty());
    }
}
