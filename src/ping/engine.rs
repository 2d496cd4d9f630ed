use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ping::receiver::{spawn_receiver, Receiver};
use crate::ping::{new_pending_map, PendingMap};
use crate::probe::{build_echo_request, create_icmp_socket, get_identifier, send_echo};
use crate::stats::{PingStats, StatsSnapshot};

/// A single matched echo reply, delivered to the reply callback
#[derive(Debug, Clone)]
pub struct PacketEvent {
    pub seq: u16,
    pub nbytes: usize,
    pub addr: IpAddr,
    pub ttl: Option<u8>,
    pub rtt: Duration,
}

/// Invoked on the receiver thread for every matched reply
pub type ReplyCallback = Box<dyn FnMut(&PacketEvent) + Send + 'static>;

/// Invoked exactly once with the final statistics, after the receiver
/// has stopped
pub type FinishCallback = Box<dyn FnOnce(&StatsSnapshot) + 'static>;

/// Poll interval while draining in-flight replies after the last send
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// One ping session: sends echo requests on an interval, correlates
/// replies on a dedicated receiver thread, and reports statistics when
/// done.
pub struct Pinger {
    config: Config,
    target: IpAddr,
    socket: Arc<socket2::Socket>,
    is_dgram: bool,
    identifier: u16,
    stats: Arc<RwLock<PingStats>>,
    pending: PendingMap,
    cancel: CancellationToken,
    on_reply: Option<ReplyCallback>,
    on_finish: Option<FinishCallback>,
}

impl Pinger {
    /// Create the session socket up front so permission problems surface
    /// before any output
    pub fn new(config: Config, target: IpAddr) -> Result<Self> {
        let socket_info = create_icmp_socket(target.is_ipv6(), config.privileged)
            .context("failed to create ICMP socket")?;

        Ok(Self {
            config,
            target,
            socket: Arc::new(socket_info.socket),
            is_dgram: socket_info.is_dgram,
            identifier: get_identifier(),
            stats: Arc::new(RwLock::new(PingStats::new())),
            pending: new_pending_map(),
            cancel: CancellationToken::new(),
            on_reply: None,
            on_finish: None,
        })
    }

    /// Token that stops the session when cancelled (Ctrl+C handling)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn set_on_reply(&mut self, callback: ReplyCallback) {
        self.on_reply = Some(callback);
    }

    pub fn set_on_finish(&mut self, callback: FinishCallback) {
        self.on_finish = Some(callback);
    }

    /// Run the session to completion.
    ///
    /// Sends `config.count` requests unless cancelled first, waits up to
    /// `config.timeout` for stragglers, then fires the finish callback.
    /// Send failures abort the run after stopping the receiver.
    pub async fn run(mut self) -> Result<()> {
        let receiver = spawn_receiver(Receiver {
            socket: Arc::clone(&self.socket),
            is_dgram: self.is_dgram,
            ipv6: self.target.is_ipv6(),
            identifier: self.identifier,
            stats: Arc::clone(&self.stats),
            pending: Arc::clone(&self.pending),
            cancel: self.cancel.clone(),
            timeout: self.config.timeout,
            on_reply: self.on_reply.take(),
        });

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut seq: u16 = 0;
        let mut sent: u64 = 0;
        let mut send_error: Option<anyhow::Error> = None;

        while sent < self.config.count {
            // A token cancelled before the first tick must stop the run
            // without sending anything
            if self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    // Register before sending so a fast reply always finds
                    // its send time
                    self.pending.write().insert(seq, Instant::now());

                    let packet = build_echo_request(
                        self.identifier,
                        seq,
                        self.config.payload_size,
                        self.target.is_ipv6(),
                    );

                    if let Err(e) = send_echo(&self.socket, &packet, self.target) {
                        self.pending.write().remove(&seq);
                        send_error = Some(e.context("failed to send echo request"));
                        break;
                    }

                    self.stats.write().record_sent();
                    seq = seq.wrapping_add(1);
                    sent += 1;
                }
            }
        }

        // Give in-flight replies a chance to arrive before tearing down
        if send_error.is_none() && !self.cancel.is_cancelled() {
            let deadline = tokio::time::Instant::now() + self.config.timeout;
            loop {
                if self.stats.read().received >= sent {
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(DRAIN_POLL) => {}
                }
            }
        }

        self.cancel.cancel();

        // Receiver exits within one read timeout of cancellation
        let receiver_result = receiver
            .join()
            .map_err(|_| anyhow::anyhow!("receiver thread panicked"))?;

        if let Some(e) = send_error {
            return Err(e);
        }
        receiver_result?;

        let snapshot = self.stats.read().snapshot(self.target);
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(&snapshot);
        }

        Ok(())
    }

    /// Final statistics without running; useful when setup succeeded but
    /// the run was never started
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.read().snapshot(self.target)
    }
}
