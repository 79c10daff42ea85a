use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, RwLock};
use tracing::*;

use super::{HealthSnapshot, LatencyHistory};

#[derive(Debug, Default)]
struct State {
    snapshot: HealthSnapshot,
    history: LatencyHistory,
}

/// Single owner of the current [`HealthSnapshot`] and latency history.
/// Every other component is a read-only observer: measurement cycles go
/// through [`replace_all`], the fixed-interval bandwidth refresh through
/// [`patch_bandwidth`], and nothing else writes.
///
/// [`replace_all`]: Aggregator::replace_all
/// [`patch_bandwidth`]: Aggregator::patch_bandwidth
#[derive(Debug)]
pub struct Aggregator {
    state: RwLock<State>,
    sender: broadcast::Sender<HealthSnapshot>,
    closed: AtomicBool,
}

impl Default for Aggregator {
    fn default() -> Self {
        let (sender, _receiver) = broadcast::channel(32);
        Self {
            state: Default::default(),
            sender,
            closed: AtomicBool::new(false),
        }
    }
}

impl Aggregator {
    pub async fn snapshot(&self) -> HealthSnapshot {
        self.state.read().await.snapshot.clone()
    }

    pub async fn history(&self) -> Vec<f64> {
        self.state.read().await.history.to_vec()
    }

    /// Subscribe to published snapshots, together with the current one.
    pub async fn subscribe(&self) -> (broadcast::Receiver<HealthSnapshot>, HealthSnapshot) {
        let state = self.state.read().await;

        (self.sender.subscribe(), state.snapshot.clone())
    }

    /// Wholesale replacement at the end of a measurement cycle. The resolved
    /// latency, when present, is appended to the history inside the same
    /// critical section, so no partially-updated state is ever observable.
    pub async fn replace_all(&self, snapshot: HealthSnapshot) {
        if self.is_closed() {
            debug!("Aggregator closed, discarding measurement cycle result");
            return;
        }

        {
            let mut state = self.state.write().await;
            if let Some(latency_ms) = snapshot.latency_ms {
                state.history.push(latency_ms);
            }
            state.snapshot = snapshot.clone();
        }

        let _ = self.sender.send(snapshot);
    }

    /// Bandwidth-only patch from the fixed-interval refresh. Touches nothing
    /// but `measured_mbps`.
    pub async fn patch_bandwidth(&self, measured_mbps: Option<f64>) {
        if self.is_closed() {
            debug!("Aggregator closed, discarding bandwidth refresh");
            return;
        }

        let snapshot = {
            let mut state = self.state.write().await;
            state.snapshot.measured_mbps = measured_mbps;
            state.snapshot.clone()
        };

        let _ = self.sender.send(snapshot);
    }

    /// Stop accepting updates. Idempotent. An in-flight measurement that
    /// resolves after this point is discarded instead of applied.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{Advisory, PublicAddress};

    fn cycle_snapshot(latency_ms: Option<f64>) -> HealthSnapshot {
        HealthSnapshot {
            connection_type: "wifi".to_string(),
            estimated_downlink_mbps: Some(25.0),
            rtt_ms: Some(60.0),
            latency_ms,
            public_address: PublicAddress::Resolved("203.0.113.7".to_string()),
            measured_mbps: Some(12.5),
            advisory: Advisory::from_latency(latency_ms),
        }
    }

    #[tokio::test]
    async fn replace_all_publishes_and_records_latency() {
        let aggregator = Aggregator::default();
        let (mut updates, initial) = aggregator.subscribe().await;
        assert_eq!(initial, HealthSnapshot::default());

        let snapshot = cycle_snapshot(Some(42.0));
        aggregator.replace_all(snapshot.clone()).await;

        assert_eq!(aggregator.snapshot().await, snapshot);
        assert_eq!(aggregator.history().await, vec![42.0]);
        assert_eq!(updates.recv().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn absent_latency_is_not_recorded() {
        let aggregator = Aggregator::default();

        aggregator.replace_all(cycle_snapshot(None)).await;

        assert!(aggregator.history().await.is_empty());
    }

    #[tokio::test]
    async fn patch_touches_only_measured_mbps() {
        let aggregator = Aggregator::default();
        aggregator.replace_all(cycle_snapshot(Some(42.0))).await;
        let before = aggregator.snapshot().await;

        aggregator.patch_bandwidth(Some(3.7)).await;

        let after = aggregator.snapshot().await;
        assert_eq!(after.measured_mbps, Some(3.7));
        assert_eq!(
            HealthSnapshot {
                measured_mbps: before.measured_mbps,
                ..after
            },
            before
        );
        // The history is driven by measurement cycles, not bandwidth patches.
        assert_eq!(aggregator.history().await, vec![42.0]);
    }

    #[tokio::test]
    async fn closed_aggregator_discards_updates() {
        let aggregator = Aggregator::default();
        aggregator.replace_all(cycle_snapshot(Some(42.0))).await;
        let at_close = aggregator.snapshot().await;

        aggregator.close();
        aggregator.close();

        aggregator.replace_all(cycle_snapshot(Some(999.0))).await;
        aggregator.patch_bandwidth(Some(0.1)).await;

        assert_eq!(aggregator.snapshot().await, at_close);
        assert_eq!(aggregator.history().await, vec![42.0]);
    }
}
