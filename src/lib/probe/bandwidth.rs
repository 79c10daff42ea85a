use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::fetch::HttpFetcher;

/// Single-shot, best-effort throughput measurement: download the reference
/// resource once, bypassing caches, and derive megabits per second from the
/// body size and elapsed wall-clock time. This is deliberately not a
/// multi-sample statistical test; one TCP slow-start-shaped download is as
/// much as the probe promises.
pub async fn measure(fetcher: &dyn HttpFetcher, url: &Url, timeout: Duration) -> Option<f64> {
    super::first_success(std::slice::from_ref(url), |url| async move {
        let start = Instant::now();
        let body = fetcher.download(url, timeout).await?;
        // Sub-microsecond completions would divide by zero.
        let elapsed_seconds = start.elapsed().as_secs_f64().max(1e-6);

        Ok(throughput_mbps(body.len(), elapsed_seconds))
    })
    .await
}

/// `(bytes * 8) / elapsed`, in megabits per second, rounded to one decimal.
fn throughput_mbps(bytes: usize, elapsed_seconds: f64) -> f64 {
    let mbps = (bytes as f64 * 8.0) / (elapsed_seconds * 1024.0 * 1024.0);

    (mbps * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FakeFetcher, FakeOutcome};

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn reference_url() -> Url {
        Url::parse("http://cdn.test/reference.bin").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn computes_throughput_from_size_and_elapsed_time() {
        let fetcher = FakeFetcher::default();
        fetcher.script(
            "http://cdn.test/reference.bin",
            FakeOutcome::Body {
                delay: Duration::from_secs(2),
                body: vec![0u8; 88_000],
            },
        );

        let mbps = measure(&fetcher, &reference_url(), TIMEOUT).await;

        // (88000 * 8) / (2.0 * 1024 * 1024) = 0.335..., one decimal.
        assert_eq!(mbps, Some(0.3));
    }

    #[tokio::test]
    async fn fetch_failure_is_unavailable() {
        let fetcher = FakeFetcher::default();

        assert_eq!(measure(&fetcher, &reference_url(), TIMEOUT).await, None);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(throughput_mbps(1024 * 1024, 1.0), 8.0);
        assert_eq!(throughput_mbps(88_000, 2.0), 0.3);
        assert_eq!(throughput_mbps(0, 1.0), 0.0);
    }
}
