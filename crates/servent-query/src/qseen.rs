//! Per-peer first-hop re-query suppression.
//!
//! A leaf neighbour occasionally resends the same search before its
//! first copy has even been answered. `QseenTable` remembers, per peer,
//! when we last admitted a given query (by compacted text or SHA-1 URN
//! hex) so a repeat within the re-query threshold is dropped rather
//! than re-admitted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use servent_router::PeerHandle;

#[derive(Default)]
pub struct QseenTable {
    seen: HashMap<(PeerHandle, String), Instant>,
}

impl QseenTable {
    pub fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    /// Check `key` as last sent by `peer`. If it was already recorded
    /// within `threshold` of `now`, this is a suppressed re-query and
    /// the stored timestamp is left untouched. Otherwise the timestamp
    /// is updated to `now` and the query may proceed.
    pub fn record(
        &mut self,
        peer: PeerHandle,
        key: &str,
        now: Instant,
        threshold: Duration,
    ) -> bool {
        let entry_key = (peer, key.to_string());
        if let Some(&last) = self.seen.get(&entry_key) {
            if now.duration_since(last) < threshold {
                return false;
            }
        }
        self.seen.insert(entry_key, now);
        true
    }
}
