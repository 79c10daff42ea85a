use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::*;

use network_health_monitor::{
    cli,
    connection::SharedConnectionInfo,
    fetch::ReqwestFetcher,
    health::HealthSnapshot,
    logger,
    monitor::manager::NetworkMonitor,
};

#[tokio::main]
async fn main() -> Result<()> {
    cli::manager::init();
    logger::manager::init();

    let fetcher = Arc::new(ReqwestFetcher::try_new()?);
    // A plain process environment exposes no connection-information source,
    // so the monitor runs on active probes alone.
    let connection = Arc::new(SharedConnectionInfo::default());

    let mut monitor = NetworkMonitor::start(cli::manager::monitor_config(), fetcher, connection);
    let (mut updates, _) = monitor.subscribe().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            update = updates.recv() => match update {
                Ok(snapshot) => report(&snapshot),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} snapshot updates"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    monitor.shutdown();

    Ok(())
}

fn report(snapshot: &HealthSnapshot) {
    let latency = snapshot
        .latency_ms
        .map(|value| format!("{value:.0} ms"))
        .unwrap_or_else(|| "—".to_string());
    let measured = snapshot
        .measured_mbps
        .map(|value| format!("{value:.1} Mbps"))
        .unwrap_or_else(|| "—".to_string());
    let estimated = snapshot
        .estimated_downlink_mbps
        .map(|value| format!("{value:.1} Mbps"))
        .unwrap_or_else(|| "—".to_string());

    info!(
        "Connection: {}, latency: {latency}, measured: {measured}, estimated: {estimated}, public address: {}. {}",
        snapshot.connection_type, snapshot.public_address, snapshot.advisory
    );
}
