//! PTP/IP connection establishment
//!
//! ```text
//! Initiator                          Responder
//!     │ ── InitCommandRequest ─────────▶ │   command channel
//!     │ ◀──────────── InitCommandAck ── │
//!     │ ── InitEventRequest ───────────▶ │   event channel
//!     │ ◀────────────── InitEventAck ── │
//! ```

use std::time::Duration;

use tracing::{debug, info};

use ptprust_core::{HostIdentity, Packet};
use ptprust_transport::Transport;

use crate::{
    error::{Error, Result},
    framing::{read_packet, write_packet},
};

/// Accepted command channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Connection number the event channel must present
    pub connection_number: u32,

    /// Identity the responder announced
    pub responder: HostIdentity,
}

/// Run the command channel half of the handshake
pub async fn init_command_channel(
    transport: &mut dyn Transport,
    identity: &HostIdentity,
    timeout: Duration,
) -> Result<Connection> {
    debug!("Initializing command channel as {}", identity);

    write_packet(transport, &Packet::InitCommandRequest(identity.clone())).await?;

    match read_packet(transport, timeout).await? {
        Packet::InitCommandAck {
            session_id,
            identity,
        } => {
            info!("Command channel accepted by {} (connection {})", identity, session_id);
            Ok(Connection {
                connection_number: session_id,
                responder: identity,
            })
        }
        Packet::InitFail { error } => Err(Error::InitFailed(error)),
        other => Err(Error::InvalidResponse(format!(
            "expected InitCommandAck, got {}",
            other
        ))),
    }
}

/// Run the event channel half of the handshake
pub async fn init_event_channel(
    transport: &mut dyn Transport,
    connection_number: u32,
    timeout: Duration,
) -> Result<()> {
    debug!("Initializing event channel for connection {}", connection_number);

    let request = Packet::InitEventRequest {
        session_id: connection_number,
    };
    write_packet(transport, &request).await?;

    match read_packet(transport, timeout).await? {
        Packet::InitEventAck => {
            info!("Event channel accepted");
            Ok(())
        }
        Packet::InitFail { error } => Err(Error::InitFailed(error)),
        other => Err(Error::InvalidResponse(format!(
            "expected InitEventAck, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ptprust_transport::MemoryTransport;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn host() -> HostIdentity {
        HostIdentity::new([7u8; 16], "ptprust", "1.0")
    }

    #[tokio::test]
    async fn test_command_channel_accepted() {
        let camera = HostIdentity::new([1u8; 16], "EOS 6D", "1.0");
        let ack = Packet::InitCommandAck {
            session_id: 3,
            identity: camera.clone(),
        };
        let mut transport = MemoryTransport::with_inbound(ack.encode());

        let connection = init_command_channel(&mut transport, &host(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(
            connection,
            Connection {
                connection_number: 3,
                responder: camera,
            }
        );

        let mut written = transport.take_outbound();
        assert_eq!(
            Packet::decode(&mut written).unwrap(),
            Packet::InitCommandRequest(host())
        );
    }

    #[tokio::test]
    async fn test_command_channel_refused() {
        let fail = Packet::InitFail { error: 0x1 };
        let mut transport = MemoryTransport::with_inbound(fail.encode());

        let result = init_command_channel(&mut transport, &host(), TIMEOUT).await;

        assert!(matches!(result, Err(Error::InitFailed(1))));
    }

    #[tokio::test]
    async fn test_event_channel() {
        let mut transport = MemoryTransport::with_inbound(Packet::InitEventAck.encode());

        init_event_channel(&mut transport, 3, TIMEOUT).await.unwrap();

        let mut written = transport.take_outbound();
        assert_eq!(
            Packet::decode(&mut written).unwrap(),
            Packet::InitEventRequest { session_id: 3 }
        );
    }

    #[tokio::test]
    async fn test_event_channel_unexpected_packet() {
        let mut transport = MemoryTransport::with_inbound(Packet::ProbeRequest.encode());

        let result = init_event_channel(&mut transport, 3, TIMEOUT).await;

        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }
}
