use ringbuffer::{AllocRingBuffer, RingBuffer};
use serde::Serialize;

pub mod aggregator;

/// Number of latency samples retained for trend rendering.
pub const LATENCY_HISTORY_LEN: usize = 30;

/// Resolved latency above this threshold trips the high-latency advisory.
pub const HIGH_LATENCY_THRESHOLD_MS: f64 = 200.0;

/// Human-readable status derived purely from the latest latency-like value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    #[default]
    Normal,
    HighLatency,
}

impl Advisory {
    /// High latency iff the resolved latency-or-RTT value is strictly above
    /// the threshold. An absent value reads as normal.
    pub fn from_latency(latency_ms: Option<f64>) -> Self {
        match latency_ms {
            Some(latency_ms) if latency_ms > HIGH_LATENCY_THRESHOLD_MS => Self::HighLatency,
            _ => Self::Normal,
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(formatter, "Latency looks good."),
            Self::HighLatency => write!(
                formatter,
                "High latency detected, consider checking VPN or router settings."
            ),
        }
    }
}

/// Public-address lookup outcome. `Unknown` (never attempted) and
/// `Unavailable` (attempted and failed) are deliberately distinct states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicAddress {
    #[default]
    Unknown,
    Resolved(String),
    Unavailable,
}

impl std::fmt::Display for PublicAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(formatter, "—"),
            Self::Resolved(address) => write!(formatter, "{address}"),
            Self::Unavailable => write!(formatter, "Unable to fetch"),
        }
    }
}

/// The published aggregate state. Exactly one snapshot is current at a time:
/// a measurement cycle replaces it wholesale, and the fixed-interval
/// bandwidth refresh may patch `measured_mbps` only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Coarse connection classification, "unknown" when the platform is
    /// silent.
    pub connection_type: String,
    /// Platform-estimated downlink, in megabits per second.
    pub estimated_downlink_mbps: Option<f64>,
    /// Platform-estimated round-trip time, in milliseconds.
    pub rtt_ms: Option<f64>,
    /// Resolved latency: active probe preferred, RTT fallback otherwise.
    /// A populated `rtt_ms` alongside a failed probe tells consumers the
    /// value is an RTT substitute.
    pub latency_ms: Option<f64>,
    pub public_address: PublicAddress,
    /// Actively measured throughput, in megabits per second.
    pub measured_mbps: Option<f64>,
    pub advisory: Advisory,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            connection_type: "unknown".to_string(),
            estimated_downlink_mbps: None,
            rtt_ms: None,
            latency_ms: None,
            public_address: PublicAddress::default(),
            measured_mbps: None,
            advisory: Advisory::default(),
        }
    }
}

/// Fixed-capacity, append-only sequence of the most recent latency samples,
/// oldest evicted first. Only the aggregator appends; consumers receive
/// copies.
#[derive(Debug)]
pub struct LatencyHistory {
    samples: AllocRingBuffer<f64>,
}

impl Default for LatencyHistory {
    fn default() -> Self {
        Self {
            samples: AllocRingBuffer::new(LATENCY_HISTORY_LEN),
        }
    }
}

impl LatencyHistory {
    pub fn push(&mut self, latency_ms: f64) {
        self.samples.push(latency_ms);
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.to_vec()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
