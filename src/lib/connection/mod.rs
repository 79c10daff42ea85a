use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

/// Platform-reported connection information, captured as an immutable
/// snapshot. Replaced wholesale on each update, never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionMetadata {
    /// Coarse link classification, e.g. "wifi", "4g", or "unknown".
    pub effective_type: String,
    /// Platform-estimated downlink, in megabits per second.
    pub downlink_mbps: Option<f64>,
    /// Platform-estimated round-trip time, in milliseconds.
    pub rtt_ms: Option<f64>,
    /// Whether the user asked for reduced data usage.
    pub save_data: bool,
}

/// Injectable connection-information capability. Availability is
/// platform-dependent, so `current` is allowed to return `None` everywhere
/// and the monitor must degrade gracefully.
pub trait ConnectionInfo: Send + Sync {
    /// Latest metadata snapshot, or `None` when the platform exposes nothing.
    fn current(&self) -> Option<ConnectionMetadata>;

    /// Subscribe to connection-change notifications. Implementations that
    /// never observe changes simply never send.
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

/// Manually driven [`ConnectionInfo`]: callers push metadata with [`set`]
/// and every subscriber is notified. The default instance carries no
/// metadata, which models platforms without the capability.
///
/// [`set`]: SharedConnectionInfo::set
#[derive(Debug, Clone)]
pub struct SharedConnectionInfo {
    metadata: Arc<RwLock<Option<ConnectionMetadata>>>,
    notifier: broadcast::Sender<()>,
}

impl Default for SharedConnectionInfo {
    fn default() -> Self {
        let (notifier, _receiver) = broadcast::channel(16);
        Self {
            metadata: Default::default(),
            notifier,
        }
    }
}

impl SharedConnectionInfo {
    pub fn new(metadata: Option<ConnectionMetadata>) -> Self {
        let info = Self::default();
        *info.metadata.write().unwrap() = metadata;
        info
    }

    /// Replace the current metadata and notify subscribers.
    pub fn set(&self, metadata: Option<ConnectionMetadata>) {
        *self.metadata.write().unwrap() = metadata;
        let _ = self.notifier.send(());
    }
}

impl ConnectionInfo for SharedConnectionInfo {
    fn current(&self) -> Option<ConnectionMetadata> {
        self.metadata.read().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notifier.subscribe()
    }
}
