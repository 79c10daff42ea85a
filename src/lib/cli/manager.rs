use std::{sync::Arc, time::Duration};

use clap::Parser;
use url::Url;

use crate::monitor::manager::MonitorConfig;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Latency probe URL, tried in order (repeatable). Defaults to a built-in
    /// list of well-known lightweight endpoints.
    #[arg(long = "latency-target", value_name = "URL")]
    latency_targets: Vec<Url>,

    /// Reference resource downloaded by the bandwidth probe, roughly
    /// 80-100 KB works well.
    #[arg(long, value_name = "URL")]
    bandwidth_url: Option<Url>,

    /// Public-address lookup endpoint answering a JSON body of shape
    /// {"ip": "..."}.
    #[arg(long, value_name = "URL")]
    address_lookup_url: Option<Url>,

    /// Seconds between bandwidth-only refreshes.
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    bandwidth_interval: u64,

    /// Seconds before a single probe target is given up on.
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    probe_timeout: u64,

    /// Turn all log categories up to Debug, for more information check
    /// RUST_LOG env variable.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct Manager {
    args: Args,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager::new());
}

impl Manager {
    fn new() -> Self {
        Self {
            args: Args::parse(),
        }
    }
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

// Check if the verbosity parameter was used
pub fn is_verbose() -> bool {
    MANAGER.args.verbose
}

/// Assemble the monitor configuration, falling back to the built-in targets
/// for anything not given on the command line.
pub fn monitor_config() -> MonitorConfig {
    let defaults = MonitorConfig::default();
    let args = &MANAGER.args;

    MonitorConfig {
        latency_targets: if args.latency_targets.is_empty() {
            defaults.latency_targets
        } else {
            args.latency_targets.clone()
        },
        bandwidth_url: args
            .bandwidth_url
            .clone()
            .unwrap_or(defaults.bandwidth_url),
        address_lookup_url: args
            .address_lookup_url
            .clone()
            .unwrap_or(defaults.address_lookup_url),
        probe_timeout: Duration::from_secs(args.probe_timeout),
        bandwidth_timeout: defaults.bandwidth_timeout,
        bandwidth_interval: Duration::from_secs(args.bandwidth_interval),
    }
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}
