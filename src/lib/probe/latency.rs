use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::{connection::ConnectionMetadata, fetch::HttpFetcher};

/// Active latency probe: a lightweight round trip against each target in
/// order, returning the elapsed wall-clock time in milliseconds for the first
/// target that responds at all. Cross-origin targets routinely answer with
/// opaque or non-2xx responses, so success is transport-level completion,
/// not response content.
pub async fn measure(
    fetcher: &dyn HttpFetcher,
    targets: &[Url],
    timeout: Duration,
) -> Option<f64> {
    super::first_success(targets, |url| async move {
        let start = Instant::now();
        fetcher.head(url, timeout).await?;

        Ok((start.elapsed().as_secs_f64() * 1000.0).round())
    })
    .await
}

/// Two-tier fallback: the active probe first, then the platform-reported RTT
/// estimate when every target failed. Returns `None` only when both tiers are
/// unavailable, and never blocks past the sum of per-target timeouts.
pub async fn resolve(
    fetcher: &dyn HttpFetcher,
    targets: &[Url],
    timeout: Duration,
    metadata: Option<&ConnectionMetadata>,
) -> Option<f64> {
    match measure(fetcher, targets, timeout).await {
        Some(elapsed_ms) => Some(elapsed_ms),
        None => metadata.and_then(|metadata| metadata.rtt_ms),
    }
}
