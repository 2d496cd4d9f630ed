use std::time::Duration;

use crate::cli::Args;
use crate::probe::{platform_requires_raw, DEFAULT_PAYLOAD_SIZE};

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of packets to send
    pub count: u64,
    /// Interval between packets
    pub interval: Duration,
    /// Reply timeout
    pub timeout: Duration,
    /// Use raw sockets
    pub privileged: bool,
    /// ICMP payload size in bytes
    pub payload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count: crate::art::BUILTIN_ART.len() as u64,
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(3),
            privileged: false,
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        // Some platforms cannot read echo replies without raw sockets;
        // force privileged mode there regardless of the flag.
        let privileged = args.privileged || platform_requires_raw();

        Self {
            count: args.count,
            interval: args.interval_duration(),
            timeout: args.timeout_duration(),
            privileged,
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}
