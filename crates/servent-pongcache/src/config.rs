//! Tunables for the pong cache, all overridable from the daemon config
//! file (`servent-daemon::config`) and given the same defaults as the
//! system this was modeled on.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct PongCacheConfig {
    /// Highest hop count kept in its own bucket (`H`); hop counts beyond
    /// this fold into the last bucket.
    pub max_hop: u8,
    /// Per-class recent-hosts FIFO size (`R`).
    pub recent_capacity: usize,
    /// Per-bucket capacity.
    pub bucket_capacity: usize,
    /// Maximum pongs returned for a single ping (`MAX_PONGS`).
    pub max_pongs: usize,
    /// Fraction of a hop bucket that must be "old" before a refresh ping
    /// is warranted (`OLD_CACHE_RATIO`).
    pub old_cache_ratio: f32,
    /// Minimum ultrapeer pongs to keep cached regardless of age
    /// (`MIN_UP_PING`).
    pub min_up_ping: usize,
    /// Fraction of cached pongs that should be ultrapeers (`UP_PING_RATIO`).
    pub up_ping_ratio: f32,
    /// How long a cached pong is considered fresh before it counts toward
    /// `old_cache_ratio` (`OLD_PING_PERIOD`).
    pub old_ping_period: Duration,
    /// Minimum duplicate ping count before throttling a peer
    /// (`min_dup_msg`).
    pub min_dup_msg: u32,
    /// Fraction of a peer's pings that must duplicate recent ones before
    /// throttling kicks in (`min_dup_ratio`).
    pub min_dup_ratio: f32,
}

impl Default for PongCacheConfig {
    fn default() -> Self {
        Self {
            max_hop: 7,
            recent_capacity: 50,
            bucket_capacity: 20,
            max_pongs: 10,
            old_cache_ratio: 0.75,
            min_up_ping: 3,
            up_ping_ratio: 0.2,
            old_ping_period: Duration::from_secs(300),
            min_dup_msg: 4,
            min_dup_ratio: 0.5,
        }
    }
}
