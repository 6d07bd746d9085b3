//! FaceLink viewer - opens a capture service and logs incoming frames.
//!
//! Usage: `face-viewer [port]` (defaults to the well-known capture
//! port). Point the mobile capture app at this machine and watch the
//! frame log; ctrl-c shuts the service down.

use facelink_runtime::{log_frame, MocapService, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,facelink_runtime=debug".into()),
        )
        .init();

    let mut config = ServiceConfig::default();
    if let Some(port) = std::env::args().nth(1) {
        config.receiver.port = port.parse()?;
    }

    let mut service = MocapService::with_config(config);
    service.dispatcher().subscribe(log_frame);
    service.dispatcher().subscribe(|frame| {
        if let Some(head) = &frame.head {
            tracing::info!(
                "head rotation ({:.1}, {:.1}, {:.1})",
                head.rotation.x,
                head.rotation.y,
                head.rotation.z
            );
        }
    });

    service.start().await?;
    tracing::info!("waiting for capture datagrams (ctrl-c to quit)");

    tokio::signal::ctrl_c().await?;
    service.stop().await;
    Ok(())
}
