use anyhow::Result;
use parking_lot::RwLock;
use socket2::Socket;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::ping::engine::{PacketEvent, ReplyCallback};
use crate::ping::PendingMap;
use crate::probe::{enable_recv_ttl, parse_echo_reply, recv_reply};
use crate::stats::PingStats;

/// Maximum consecutive receive errors before stopping the receiver
const MAX_CONSECUTIVE_ERRORS: u32 = 50;

/// Maximum packets to drain per iteration before yielding to timeout
/// cleanup
const MAX_DRAIN_BATCH: usize = 100;

/// Listens for echo replies and correlates them to pending requests.
///
/// Runs on a dedicated OS thread with blocking reads; the short socket
/// read timeout keeps cancellation latency low.
pub(crate) struct Receiver {
    pub socket: Arc<Socket>,
    pub is_dgram: bool,
    pub ipv6: bool,
    pub identifier: u16,
    pub stats: Arc<RwLock<PingStats>>,
    pub pending: PendingMap,
    pub cancel: CancellationToken,
    pub timeout: Duration,
    pub on_reply: Option<ReplyCallback>,
}

impl Receiver {
    pub fn run_blocking(mut self) -> Result<()> {
        // TTL reception is best-effort; replies still render with ttl=?
        // when unavailable
        let _ = enable_recv_ttl(&self.socket, self.ipv6);

        let mut consecutive_errors: u32 = 0;
        let mut buffer = [0u8; 1500];

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            // Drain queued packets first so bursts aren't dropped
            let mut drained = 0;
            loop {
                if drained >= MAX_DRAIN_BATCH {
                    break;
                }

                match recv_reply(&self.socket, &mut buffer, self.ipv6) {
                    Ok(recv_result) => {
                        consecutive_errors = 0;
                        drained += 1;

                        let parsed = parse_echo_reply(
                            &buffer[..recv_result.len],
                            recv_result.source,
                            self.identifier,
                            self.is_dgram,
                        );
                        let Some(reply) = parsed else { continue };

                        // A missing entry means the reply is late or a
                        // duplicate; drop it either way
                        let Some(sent_at) = self.pending.write().remove(&reply.seq) else {
                            continue;
                        };

                        let rtt = Instant::now().duration_since(sent_at);
                        self.stats.write().record_reply(rtt);

                        if let Some(on_reply) = self.on_reply.as_mut() {
                            let event = PacketEvent {
                                seq: reply.seq,
                                nbytes: reply.nbytes,
                                addr: reply.responder,
                                // Raw sockets carry the TTL in the IP
                                // header, DGRAM sockets in ancillary data
                                ttl: reply.ttl.or(recv_result.response_ttl),
                                rtt,
                            };
                            on_reply(&event);
                        }
                    }
                    Err(e) => {
                        // WouldBlock/TimedOut means the socket is drained
                        let is_timeout = e.downcast_ref::<std::io::Error>().is_some_and(|io| {
                            io.kind() == std::io::ErrorKind::WouldBlock
                                || io.kind() == std::io::ErrorKind::TimedOut
                        });

                        if is_timeout {
                            consecutive_errors = 0;
                        } else {
                            consecutive_errors += 1;
                            if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                                return Err(anyhow::anyhow!(
                                    "receiver stopped after {} consecutive errors (last: {:#})",
                                    consecutive_errors,
                                    e
                                ));
                            }
                        }
                        break;
                    }
                }
            }

            // Sweep requests that will never be answered so the map stays
            // bounded
            {
                let now = Instant::now();
                let timeout = self.timeout;
                self.pending
                    .write()
                    .retain(|_, sent_at| now.duration_since(*sent_at) <= timeout);
            }
        }

        Ok(())
    }
}

/// Spawn the receiver on a dedicated OS thread, converting panics into
/// errors the engine can report
pub(crate) fn spawn_receiver(receiver: Receiver) -> std::thread::JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| receiver.run_blocking())) {
            Ok(result) => result,
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                Err(anyhow::anyhow!("receiver panicked: {}", msg))
            }
        }
    })
}
