//! The pong cache: hop-indexed cached pongs, a recent-hosts FIFO, ping/pong
//! admission rules, and per-ping demultiplexing so a single ping gets
//! answered from several hop buckets without over-delivering at any one
//! of them.

pub mod admission;
pub mod cache;
pub mod config;
pub mod demux;

pub use admission::{admit_ping, admit_pong, PingAdmission};
pub use cache::{CachedPong, HostClass, PongCache};
pub use config::PongCacheConfig;
pub use demux::{PingDemuxState, PongDemux};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn end_to_end_ping_then_cached_pongs() {
        let config = PongCacheConfig::default();
        let mut cache = PongCache::new(config.clone());
        cache.insert(
            CachedPong {
                ip: [1, 2, 3, 4],
                port: 6346,
                files_shared: 10,
                kb_shared: 1024,
                is_ultra: true,
                cached_at: Instant::now(),
            },
            2,
        );

        let decision = admit_ping(1, 5, false, 0, 0, &config);
        assert_eq!(decision, PingAdmission::Standard { forward: true });

        let mut rng = rand::thread_rng();
        let sample = cache.sample(2, 5, &mut rng);
        assert_eq!(sample.len(), 1);
        assert!(sample[0].is_ultra);
    }
}
