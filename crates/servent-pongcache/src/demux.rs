//! Per-ping demultiplexing state.
//!
//! A single outstanding ping is answered from several hop buckets at
//! once; this tracks, per MUID, how many more pongs we still owe at each
//! hop so we stop pulling from a bucket once its quota for this ping is
//! met instead of flooding every cached pong we have.

use std::collections::HashMap;

use servent_wire::header::Muid;

/// Per-ping outstanding pong quota, one slot per hop bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingDemuxState {
    need: Vec<u32>,
}

impl PingDemuxState {
    pub fn new(max_hop: u8, per_hop_quota: u32) -> Self {
        Self {
            need: vec![per_hop_quota; max_hop as usize + 1],
        }
    }

    fn idx(&self, hops: u8) -> usize {
        (hops as usize).min(self.need.len() - 1)
    }

    /// Whether we still owe any pongs at `hops` for this ping.
    pub fn wants(&self, hops: u8) -> bool {
        self.need[self.idx(hops)] > 0
    }

    /// Record that we've sent one more pong at `hops` for this ping.
    pub fn fulfil_one(&mut self, hops: u8) {
        let idx = self.idx(hops);
        if self.need[idx] > 0 {
            self.need[idx] -= 1;
        }
    }

    /// Whether every hop's quota has been met and this ping can be
    /// forgotten.
    pub fn is_satisfied(&self) -> bool {
        self.need.iter().all(|&n| n == 0)
    }
}

/// Demultiplexer tracking outstanding state for every ping we're still
/// answering, keyed by MUID.
#[derive(Default)]
pub struct PongDemux {
    states: HashMap<Muid, PingDemuxState>,
}

impl PongDemux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, muid: Muid, state: PingDemuxState) {
        self.states.insert(muid, state);
    }

    pub fn wants(&self, muid: &Muid, hops: u8) -> bool {
        self.states.get(muid).is_some_and(|s| s.wants(hops))
    }

    /// Record one pong sent for `muid` at `hops`; drops the ping's state
    /// entirely once satisfied, so it stops being tracked.
    pub fn record_sent(&mut self, muid: &Muid, hops: u8) {
        if let Some(state) = self.states.get_mut(muid) {
            state.fulfil_one(hops);
            if state.is_satisfied() {
                self.states.remove(muid);
            }
        }
    }

    pub fn is_tracked(&self, muid: &Muid) -> bool {
        self.states.contains_key(muid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_wants_every_hop() {
        let state = PingDemuxState::new(7, 2);
        assert!(state.wants(0));
        assert!(state.wants(7));
        assert!(!state.is_satisfied());
    }

    #[test]
    fn hops_beyond_max_clamp_to_last_slot() {
        let mut state = PingDemuxState::new(7, 1);
        state.fulfil_one(99);
        assert!(!state.wants(7));
        assert!(!state.wants(99));
    }

    #[test]
    fn satisfied_once_all_quotas_exhausted() {
        let mut state = PingDemuxState::new(1, 1);
        state.fulfil_one(0);
        state.fulfil_one(1);
        assert!(state.is_satisfied());
    }

    #[test]
    fn demux_forgets_satisfied_ping() {
        let mut demux = PongDemux::new();
        let muid = [1u8; 16];
        demux.begin(muid, PingDemuxState::new(0, 1));
        assert!(demux.is_tracked(&muid));
        demux.record_sent(&muid, 0);
        assert!(!demux.is_tracked(&muid));
    }

    #[test]
    fn untracked_muid_wants_nothing() {
        let demux = PongDemux::new();
        assert!(!demux.wants(&[9u8; 16], 0));
    }
}
