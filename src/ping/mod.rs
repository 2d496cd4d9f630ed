mod engine;
mod receiver;

pub use engine::{FinishCallback, PacketEvent, Pinger, ReplyCallback};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Sequence number to send time, shared between sender and receiver
pub(crate) type PendingMap = Arc<RwLock<HashMap<u16, Instant>>>;

pub(crate) fn new_pending_map() -> PendingMap {
    Arc::new(RwLock::new(HashMap::new()))
}
