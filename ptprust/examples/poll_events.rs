//! Event polling example

use std::time::Duration;

use ptprust::{EventCode, HostIdentity, Initiator};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ip = std::env::var("CAMERA_IP").unwrap_or_else(|_| "192.168.1.2".to_string());
    let host = HostIdentity::new([0x5A; 16], "ptprust", "1.0");

    let mut camera = Initiator::connect_ip_default(ip, &host)
        .await?
        .with_timeout(Duration::from_secs(10));
    camera.open_session(1).await?;

    println!("Polling events, press Ctrl+C to stop");

    loop {
        for event in camera.check_events().await? {
            match event.code {
                EventCode::PropValueChanged => println!(
                    "Property 0x{:04X} = {}",
                    event.param(0).unwrap_or_default(),
                    event.param(1).unwrap_or_default()
                ),
                EventCode::WillSoonShutdown => {
                    println!("Camera is shutting down");
                    camera.disconnect().await?;
                    return Ok(());
                }
                _ => println!("{}", event),
            }
        }

        sleep(Duration::from_millis(500)).await;
    }
}
