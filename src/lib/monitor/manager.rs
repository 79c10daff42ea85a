use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tracing::*;
use url::Url;

use crate::{
    connection::ConnectionInfo,
    fetch::HttpFetcher,
    health::{aggregator::Aggregator, Advisory, HealthSnapshot},
    probe::{address, bandwidth, latency},
};

/// Fixed network targets and cadences. These are configuration, not user
/// input: defaults mirror the deployment the monitor was written for.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Latency probe targets, tried in order. The list is the fallback chain.
    pub latency_targets: Vec<Url>,
    /// Reference resource for the bandwidth probe, roughly 80-100 KB.
    pub bandwidth_url: Url,
    /// Public-address lookup endpoint answering `{"ip": "..."}`.
    pub address_lookup_url: Url,
    /// Per-target budget for the latency probe and the address lookup.
    pub probe_timeout: Duration,
    /// Budget for the bandwidth reference download.
    pub bandwidth_timeout: Duration,
    /// Cadence of the bandwidth-only refresh.
    pub bandwidth_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            latency_targets: vec![
                Url::parse("https://www.google.com/favicon.ico").unwrap(),
                Url::parse("https://cdn.jsdelivr.net/npm/jquery@3.6.0/dist/jquery.min.js")
                    .unwrap(),
                Url::parse(
                    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
                )
                .unwrap(),
            ],
            bandwidth_url: Url::parse(
                "https://cdn.jsdelivr.net/npm/jquery@3.6.0/dist/jquery.min.js",
            )
            .unwrap(),
            address_lookup_url: Url::parse("https://api.ipify.org/?format=json").unwrap(),
            probe_timeout: Duration::from_secs(5),
            bandwidth_timeout: Duration::from_secs(30),
            bandwidth_interval: Duration::from_secs(10),
        }
    }
}

/// Sampling scheduler. Owns the aggregator plus two independent tasks:
///
/// - the event-driven task runs one full measurement cycle immediately and
///   another per connection-change notification, each awaited to completion
///   so cycles of the same kind never overlap;
/// - the fixed-interval task re-runs only the bandwidth probe and patches
///   `measured_mbps`.
///
/// [`shutdown`] tears both down deterministically and is also run on drop.
///
/// [`shutdown`]: NetworkMonitor::shutdown
#[derive(Debug)]
pub struct NetworkMonitor {
    aggregator: Arc<Aggregator>,
    cycle_task: Option<tokio::task::JoinHandle<()>>,
    bandwidth_task: Option<tokio::task::JoinHandle<()>>,
}

impl NetworkMonitor {
    pub fn start(
        config: MonitorConfig,
        fetcher: Arc<dyn HttpFetcher>,
        connection: Arc<dyn ConnectionInfo>,
    ) -> Self {
        let aggregator = Arc::new(Aggregator::default());

        debug!("Starting measurement cycle task...");
        let cycle_task = tokio::spawn({
            let aggregator = aggregator.clone();
            let fetcher = fetcher.clone();
            let connection = connection.clone();
            let config = config.clone();

            async move {
                let mut changes = connection.subscribe();

                run_measurement_cycle(&*fetcher, &*connection, &config, &aggregator).await;

                loop {
                    match changes.recv().await {
                        // A lagged receiver still means the connection
                        // changed at least once, so a cycle is due either way.
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            run_measurement_cycle(&*fetcher, &*connection, &config, &aggregator)
                                .await;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Connection-change source closed, stopping event-driven sampling");
                            break;
                        }
                    }
                }
            }
        });

        debug!("Starting bandwidth refresh task...");
        let bandwidth_task = tokio::spawn({
            let aggregator = aggregator.clone();
            let fetcher = fetcher.clone();
            let config = config.clone();

            async move {
                let mut period = tokio::time::interval(config.bandwidth_interval);
                // The initial full cycle already measures bandwidth; the
                // first refresh belongs one interval later.
                period.tick().await;

                loop {
                    period.tick().await;

                    let measured_mbps = bandwidth::measure(
                        &*fetcher,
                        &config.bandwidth_url,
                        config.bandwidth_timeout,
                    )
                    .await;
                    aggregator.patch_bandwidth(measured_mbps).await;
                }
            }
        });

        Self {
            aggregator,
            cycle_task: Some(cycle_task),
            bandwidth_task: Some(bandwidth_task),
        }
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        self.aggregator.snapshot().await
    }

    pub async fn history(&self) -> Vec<f64> {
        self.aggregator.history().await
    }

    pub async fn subscribe(&self) -> (broadcast::Receiver<HealthSnapshot>, HealthSnapshot) {
        self.aggregator.subscribe().await
    }

    /// Deterministic teardown. The aggregator is closed first, so an
    /// in-flight cycle that resolves during or after the call is discarded
    /// instead of applied, then both tasks are cancelled. Idempotent.
    pub fn shutdown(&mut self) {
        self.aggregator.close();

        if let Some(handle) = self.cycle_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.bandwidth_task.take() {
            handle.abort();
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One full measurement cycle: resolve latency with its RTT fallback, read
/// the metadata snapshot, measure bandwidth, look up the public address,
/// derive the advisory, then hand the assembled snapshot to the aggregator
/// as a single unit.
#[instrument(level = "debug", skip_all)]
async fn run_measurement_cycle(
    fetcher: &dyn HttpFetcher,
    connection: &dyn ConnectionInfo,
    config: &MonitorConfig,
    aggregator: &Aggregator,
) {
    let metadata = connection.current();

    let latency_ms = latency::resolve(
        fetcher,
        &config.latency_targets,
        config.probe_timeout,
        metadata.as_ref(),
    )
    .await;
    let measured_mbps =
        bandwidth::measure(fetcher, &config.bandwidth_url, config.bandwidth_timeout).await;
    let public_address =
        address::lookup(fetcher, &config.address_lookup_url, config.probe_timeout).await;
    let advisory = Advisory::from_latency(latency_ms);

    let snapshot = HealthSnapshot {
        connection_type: metadata
            .as_ref()
            .map(|metadata| metadata.effective_type.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        estimated_downlink_mbps: metadata.as_ref().and_then(|metadata| metadata.downlink_mbps),
        rtt_ms: metadata.as_ref().and_then(|metadata| metadata.rtt_ms),
        latency_ms,
        public_address,
        measured_mbps,
        advisory,
    };

    trace!("Measurement cycle complete: {snapshot:?}");
    aggregator.replace_all(snapshot).await;
}
