//! Hop-indexed pong cache plus the per-host-class recent FIFO.

use std::collections::VecDeque;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PongCacheConfig;

/// A cached pong, enough to reconstruct the wire message plus the
/// bookkeeping the cache needs.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedPong {
    pub ip: [u8; 4],
    pub port: u16,
    pub files_shared: u32,
    pub kb_shared: u32,
    pub is_ultra: bool,
    pub cached_at: Instant,
}

impl CachedPong {
    pub fn is_fresh(&self, period: std::time::Duration, now: Instant) -> bool {
        now.duration_since(self.cached_at) < period
    }
}

/// Which recent-hosts FIFO a pong belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostClass {
    Any,
    Ultra,
}

impl HostClass {
    fn of(pong: &CachedPong) -> Self {
        if pong.is_ultra {
            HostClass::Ultra
        } else {
            HostClass::Any
        }
    }
}

pub struct PongCache {
    config: PongCacheConfig,
    buckets: Vec<VecDeque<CachedPong>>,
    recent_any: VecDeque<CachedPong>,
    recent_ultra: VecDeque<CachedPong>,
}

impl PongCache {
    pub fn new(config: PongCacheConfig) -> Self {
        let buckets = (0..=config.max_hop as usize).map(|_| VecDeque::new()).collect();
        Self {
            config,
            buckets,
            recent_any: VecDeque::new(),
            recent_ultra: VecDeque::new(),
        }
    }

    fn bucket_index(&self, hops: u8) -> usize {
        (hops as usize).min(self.config.max_hop as usize)
    }

    /// Insert a freshly received pong, seen at `hops` hops from us.
    pub fn insert(&mut self, pong: CachedPong, hops: u8) {
        let idx = self.bucket_index(hops);
        let bucket = &mut self.buckets[idx];
        if bucket.len() >= self.config.bucket_capacity {
            bucket.pop_front();
        }
        bucket.push_back(pong.clone());

        let recent = match HostClass::of(&pong) {
            HostClass::Any => &mut self.recent_any,
            HostClass::Ultra => &mut self.recent_ultra,
        };
        if recent.len() >= self.config.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(pong);
    }

    /// Reservoir-sample up to `count` pongs from the bucket at `hops`, the
    /// way a leaf's rebroadcast of a ping picks which cached pongs to
    /// answer with instead of returning the whole bucket.
    pub fn sample(&self, hops: u8, count: usize, rng: &mut impl Rng) -> Vec<CachedPong> {
        let idx = self.bucket_index(hops);
        let bucket = &self.buckets[idx];
        let n = count.min(self.config.max_pongs);
        if bucket.len() <= n {
            return bucket.iter().cloned().collect();
        }
        let mut reservoir: Vec<CachedPong> = bucket.iter().take(n).cloned().collect();
        for (i, candidate) in bucket.iter().enumerate().skip(n) {
            let j = rng.gen_range(0..=i);
            if j < n {
                reservoir[j] = candidate.clone();
            }
        }
        reservoir
    }

    pub fn bucket_len(&self, hops: u8) -> usize {
        self.buckets[self.bucket_index(hops)].len()
    }

    /// Fraction of the bucket at `hops` that is stale, used to decide
    /// whether a neighbour refresh ping is warranted.
    pub fn stale_ratio(&self, hops: u8, now: Instant) -> f32 {
        let bucket = &self.buckets[self.bucket_index(hops)];
        if bucket.is_empty() {
            return 1.0;
        }
        let stale = bucket
            .iter()
            .filter(|p| !p.is_fresh(self.config.old_ping_period, now))
            .count();
        stale as f32 / bucket.len() as f32
    }

    /// Whether the bucket at `hops` needs a refresh: either too few
    /// ultrapeers, or too much of it is stale.
    pub fn needs_refresh(&self, hops: u8, now: Instant) -> bool {
        let bucket = &self.buckets[self.bucket_index(hops)];
        let ultra_count = bucket.iter().filter(|p| p.is_ultra).count();
        let wants_more_ultra = (ultra_count as f32) < self.config.up_ping_ratio * bucket.len() as f32
            || ultra_count < self.config.min_up_ping;
        wants_more_ultra || self.stale_ratio(hops, now) >= self.config.old_cache_ratio
    }

    /// A random sample from the recent-hosts FIFO for `class`, used to
    /// answer pings we don't want to route deeper into the hop buckets
    /// for.
    pub fn sample_recent(&self, class: HostClass, count: usize, rng: &mut impl Rng) -> Vec<CachedPong> {
        let recent = match class {
            HostClass::Any => &self.recent_any,
            HostClass::Ultra => &self.recent_ultra,
        };
        let mut items: Vec<&CachedPong> = recent.iter().collect();
        items.shuffle(rng);
        items.into_iter().take(count).cloned().collect()
    }
}
