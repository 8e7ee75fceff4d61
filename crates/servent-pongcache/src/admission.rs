//! Ping and pong admission rules: what to do with an inbound ping before
//! consulting the cache, and whether an inbound pong is even worth
//! caching.

use std::collections::HashSet;

use crate::config::PongCacheConfig;

/// Disposition of an inbound ping, decided before the cache is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingAdmission {
    /// `hops == 0, ttl <= 1`: a direct liveness probe. Answered with a
    /// single minimal pong, never forwarded.
    AliveCheck,
    /// Carries a crawler marker: answered with as full a host list as we
    /// have, never forwarded.
    Crawler,
    /// An ordinary ping.
    Standard { forward: bool },
    /// This peer is sending duplicate pings fast enough to throttle.
    Throttled,
}

/// Decide what to do with a ping, given its header fields and how
/// frequently this peer has been repeating itself recently.
pub fn admit_ping(
    hops: u8,
    ttl: u8,
    is_crawler: bool,
    recent_duplicate_count: u32,
    recent_total_count: u32,
    config: &PongCacheConfig,
) -> PingAdmission {
    if hops == 0 && ttl <= 1 {
        return PingAdmission::AliveCheck;
    }
    if is_crawler {
        return PingAdmission::Crawler;
    }
    let ratio = recent_duplicate_count as f32 / recent_total_count.max(1) as f32;
    if recent_duplicate_count >= config.min_dup_msg && ratio >= config.min_dup_ratio {
        return PingAdmission::Throttled;
    }
    PingAdmission::Standard { forward: ttl > 0 }
}

/// Whether `ip` is within `127.0.0.0/8`.
fn is_loopback(ip: [u8; 4]) -> bool {
    ip[0] == 127
}

/// Whether an inbound pong is sane enough to cache at all: routable
/// (not null, not loopback, not broadcast), not in the hostiles set, and
/// not pointing at ourselves.
pub fn admit_pong(
    ip: [u8; 4],
    port: u16,
    self_ip: [u8; 4],
    hostile: &HashSet<[u8; 4]>,
) -> bool {
    port != 0
        && ip != [0, 0, 0, 0]
        && ip != [255, 255, 255, 255]
        && !is_loopback(ip)
        && ip != self_ip
        && !hostile.contains(&ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alive_check_detected() {
        let cfg = PongCacheConfig::default();
        assert_eq!(admit_ping(0, 1, false, 0, 0, &cfg), PingAdmission::AliveCheck);
        assert_eq!(admit_ping(0, 0, false, 0, 0, &cfg), PingAdmission::AliveCheck);
    }

    #[test]
    fn crawler_overrides_standard() {
        let cfg = PongCacheConfig::default();
        assert_eq!(admit_ping(1, 5, true, 0, 0, &cfg), PingAdmission::Crawler);
    }

    #[test]
    fn ttl_zero_is_standard_not_forwarded() {
        let cfg = PongCacheConfig::default();
        assert_eq!(
            admit_ping(1, 0, false, 0, 0, &cfg),
            PingAdmission::Standard { forward: false }
        );
    }

    #[test]
    fn throttled_once_duplicate_ratio_exceeded() {
        let cfg = PongCacheConfig::default();
        let decision = admit_ping(1, 5, false, cfg.min_dup_msg, cfg.min_dup_msg, &cfg);
        assert_eq!(decision, PingAdmission::Throttled);
    }

    #[test]
    fn below_min_dup_msg_not_throttled_even_if_ratio_high() {
        let cfg = PongCacheConfig::default();
        let decision = admit_ping(1, 5, false, cfg.min_dup_msg - 1, cfg.min_dup_msg - 1, &cfg);
        assert_eq!(decision, PingAdmission::Standard { forward: true });
    }

    #[test]
    fn pong_admission_rejects_null_address() {
        let none = HashSet::new();
        let self_ip = [9, 9, 9, 9];
        assert!(!admit_pong([0, 0, 0, 0], 6346, self_ip, &none));
        assert!(!admit_pong([1, 2, 3, 4], 0, self_ip, &none));
        assert!(admit_pong([1, 2, 3, 4], 6346, self_ip, &none));
    }

    #[test]
    fn pong_admission_rejects_loopback() {
        let none = HashSet::new();
        let self_ip = [9, 9, 9, 9];
        assert!(!admit_pong([127, 0, 0, 1], 6346, self_ip, &none));
        assert!(!admit_pong([127, 255, 1, 2], 6346, self_ip, &none));
    }

    #[test]
    fn pong_admission_rejects_self_and_hostiles() {
        let self_ip = [1, 2, 3, 4];
        let mut hostile = HashSet::new();
        hostile.insert([5, 6, 7, 8]);
        assert!(!admit_pong(self_ip, 6346, self_ip, &hostile));
        assert!(!admit_pong([5, 6, 7, 8], 6346, self_ip, &hostile));
        assert!(admit_pong([1, 1, 1, 1], 6346, self_ip, &hostile));
    }
}
