//! Remote capture example

use ptprust::{HostIdentity, Initiator};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ptprust::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let ip = std::env::var("CAMERA_IP").unwrap_or_else(|_| "192.168.1.2".to_string());
    let host = HostIdentity::new(*b"ptprust-capture!", "ptprust", "1.0");

    let mut camera = Initiator::connect_ip_default(ip, &host).await?;
    camera.open_session(1).await?;

    let info = camera.get_device_info().await?;
    println!("Connected to {}", info);

    match camera.initiate_capture(0, 0).await {
        Ok(()) => println!("Captured!"),
        Err(ptprust::Error::NoFocus) => println!("Could not focus, try again"),
        Err(e) => return Err(e),
    }

    // New objects are announced as events
    for event in camera.check_events().await? {
        println!("{}", event);
    }

    camera.disconnect().await?;

    Ok(())
}
