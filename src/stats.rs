use std::net::IpAddr;
use std::time::Duration;

/// Accumulator for one ping session
#[derive(Debug, Clone)]
pub struct PingStats {
    pub sent: u64,
    pub received: u64,

    // Latency stats (Welford's online algorithm)
    min_rtt: Duration,
    max_rtt: Duration,
    mean_rtt: f64, // microseconds
    m2: f64,       // for stddev calculation
}

impl PingStats {
    pub fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
            min_rtt: Duration::MAX,
            max_rtt: Duration::ZERO,
            mean_rtt: 0.0,
            m2: 0.0,
        }
    }

    /// Record that a packet was sent
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// Update stats with a new RTT sample
    pub fn record_reply(&mut self, rtt: Duration) {
        self.received += 1;

        let rtt_micros = rtt.as_micros() as f64;

        if rtt < self.min_rtt {
            self.min_rtt = rtt;
        }
        if rtt > self.max_rtt {
            self.max_rtt = rtt;
        }

        // Welford's online algorithm for mean and variance
        let delta = rtt_micros - self.mean_rtt;
        self.mean_rtt += delta / self.received as f64;
        let delta2 = rtt_micros - self.mean_rtt;
        self.m2 += delta * delta2;
    }

    /// Loss percentage
    pub fn loss_pct(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            (1.0 - (self.received as f64 / self.sent as f64)) * 100.0
        }
    }

    /// Average RTT
    pub fn avg_rtt(&self) -> Duration {
        Duration::from_micros(self.mean_rtt as u64)
    }

    /// Standard deviation (population)
    pub fn stddev(&self) -> Duration {
        if self.received < 2 {
            return Duration::ZERO;
        }
        let variance = self.m2 / self.received as f64;
        Duration::from_micros(variance.sqrt() as u64)
    }

    /// Freeze the accumulator into a summary for the finish callback
    pub fn snapshot(&self, addr: IpAddr) -> StatsSnapshot {
        let min_rtt = if self.received == 0 {
            Duration::ZERO
        } else {
            self.min_rtt
        };

        StatsSnapshot {
            addr,
            sent: self.sent,
            received: self.received,
            loss_pct: self.loss_pct(),
            min_rtt,
            avg_rtt: self.avg_rtt(),
            max_rtt: self.max_rtt,
            stddev_rtt: self.stddev(),
        }
    }
}

impl Default for PingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics handed to the finish callback at session end
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub addr: IpAddr,
    pub sent: u64,
    pub received: u64,
    pub loss_pct: f64,
    pub min_rtt: Duration,
    pub avg_rtt: Duration,
    pub max_rtt: Duration,
    pub stddev_rtt: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_initial_state() {
        let stats = PingStats::new();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_pct(), 0.0);
        assert_eq!(stats.avg_rtt(), Duration::ZERO);
        assert_eq!(stats.stddev(), Duration::ZERO);
    }

    #[test]
    fn test_single_sample() {
        let mut stats = PingStats::new();
        let rtt = Duration::from_millis(10);

        stats.record_sent();
        stats.record_reply(rtt);

        assert_eq!(stats.received, 1);
        assert_eq!(stats.avg_rtt(), rtt);
        assert_eq!(stats.stddev(), Duration::ZERO); // stddev needs 2+ samples

        let snap = stats.snapshot(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(snap.min_rtt, rtt);
        assert_eq!(snap.max_rtt, rtt);
    }

    #[test]
    fn test_welford_known_samples() {
        let mut stats = PingStats::new();

        // Samples 10, 20, 30 ms: mean = 20ms, population stddev ~ 8.16ms
        for ms in [10, 20, 30] {
            stats.record_sent();
            stats.record_reply(Duration::from_millis(ms));
        }

        assert_eq!(stats.received, 3);
        assert_eq!(stats.avg_rtt().as_millis(), 20);

        let stddev_us = stats.stddev().as_micros();
        assert!(stddev_us > 8000 && stddev_us < 8500);
    }

    #[test]
    fn test_loss_calculation() {
        let mut stats = PingStats::new();

        for _ in 0..10 {
            stats.record_sent();
        }
        assert_eq!(stats.loss_pct(), 100.0);

        for _ in 0..7 {
            stats.record_reply(Duration::from_millis(5));
        }
        assert!((stats.loss_pct() - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_snapshot_with_no_replies() {
        let mut stats = PingStats::new();
        stats.record_sent();
        stats.record_sent();

        let snap = stats.snapshot(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));

        assert_eq!(snap.sent, 2);
        assert_eq!(snap.received, 0);
        assert_eq!(snap.loss_pct, 100.0);
        // Min must not leak the Duration::MAX sentinel
        assert_eq!(snap.min_rtt, Duration::ZERO);
        assert_eq!(snap.max_rtt, Duration::ZERO);
    }
}
