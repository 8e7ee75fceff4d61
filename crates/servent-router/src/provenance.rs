//! The chunked, round-robin message provenance table.
//!
//! Every request we forward (Ping, Query) is remembered under its MUID so
//! a later reply (Pong, Query Hit) can be routed back along the reverse
//! path, and so a MUID we've already seen can be recognized as a
//! duplicate. Rather than one unbounded map, the table is split into `M`
//! chunks of `N` entries each; once a chunk fills we advance to the next
//! one and clear it, bounding memory use at the cost of eventually
//! forgetting old routes. A chunk is only reclaimed after it has existed
//! for at least `T_MIN`, so a burst of traffic can't wrap the whole table
//! and evict a route before its reply had a chance to arrive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use servent_wire::header::Muid;

use crate::peer::PeerHandle;

/// Entries per chunk.
pub const CHUNK_CAPACITY: usize = 1 << 14;
/// Number of chunks kept in rotation.
pub const CHUNK_COUNT: usize = 32;
/// Minimum lifetime of a chunk before it may be recycled.
pub const MIN_CHUNK_AGE: Duration = Duration::from_secs(1800);

/// What we remember about a forwarded request. A routing entry names a
/// *list* of route-data, not a single peer: two different peers can
/// broadcast the same request, and a reply must be able to reach either.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    /// Every peer this request has arrived from, in arrival order. The
    /// head of the list is the first peer to have sent it.
    pub routes: Vec<PeerHandle>,
    /// Whether this request also (or only) originated locally.
    pub local_origin: bool,
    /// Servent id carried by a Query Hit for this MUID, filled in once the
    /// first hit comes back (`QUERY_HIT_ROUTE_SAVE`), used for later Push
    /// routing toward that servent.
    pub query_hit_servent_id: Option<[u8; 16]>,
}

impl RouteEntry {
    fn new(from: Option<PeerHandle>) -> Self {
        Self {
            routes: from.into_iter().collect(),
            local_origin: from.is_none(),
            query_hit_servent_id: None,
        }
    }
}

struct Chunk {
    entries: HashMap<Muid, RouteEntry>,
    started_at: Instant,
}

impl Chunk {
    fn new(now: Instant) -> Self {
        Self {
            entries: HashMap::new(),
            started_at: now,
        }
    }
}

pub struct ProvenanceTable {
    chunks: Vec<Chunk>,
    current: usize,
}

impl ProvenanceTable {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            chunks: (0..CHUNK_COUNT).map(|_| Chunk::new(now)).collect(),
            current: 0,
        }
    }

    /// Locate the chunk (if any) currently holding `muid`, searching the
    /// current chunk first since a reply almost always follows its
    /// request quickly.
    fn find_chunk(&self, muid: &Muid) -> Option<usize> {
        if self.chunks[self.current].entries.contains_key(muid) {
            return Some(self.current);
        }
        for offset in 1..self.chunks.len() {
            let idx = (self.current + self.chunks.len() - offset) % self.chunks.len();
            if self.chunks[idx].entries.contains_key(muid) {
                return Some(idx);
            }
        }
        None
    }

    /// Record a route for `muid`. Returns `false` if `muid` was already
    /// present in any live chunk, in which case `from` is appended to the
    /// existing entry's route list instead of being dropped.
    pub fn record(&mut self, muid: Muid, from: Option<PeerHandle>) -> bool {
        if let Some(chunk_idx) = self.find_chunk(&muid) {
            let entry = self.chunks[chunk_idx]
                .entries
                .get_mut(&muid)
                .expect("chunk_idx located via find_chunk");
            match from {
                Some(peer) if !entry.routes.contains(&peer) => entry.routes.push(peer),
                Some(_) => {}
                None => entry.local_origin = true,
            }
            return false;
        }
        self.advance_if_full();
        self.chunks[self.current]
            .entries
            .insert(muid, RouteEntry::new(from));
        true
    }

    /// Find the route recorded for `muid`.
    pub fn lookup(&self, muid: &Muid) -> Option<&RouteEntry> {
        let chunk_idx = self.find_chunk(muid)?;
        self.chunks[chunk_idx].entries.get(muid)
    }

    /// Fill in the Query Hit servent-id provenance for `muid`, once the
    /// first hit for that query arrives, and revitalise the entry by
    /// relocating it to the cursor's (current chunk's) position — the
    /// same treatment a brand new entry gets, extending its effective
    /// lifetime by at least one chunk rotation.
    pub fn save_query_hit_provenance(&mut self, muid: &Muid, servent_id: [u8; 16]) {
        if let Some(chunk_idx) = self.find_chunk(muid) {
            let mut entry = self.chunks[chunk_idx]
                .entries
                .remove(muid)
                .expect("chunk_idx located via find_chunk");
            entry.query_hit_servent_id = Some(servent_id);
            self.chunks[self.current].entries.insert(*muid, entry);
        }
    }

    /// Advance to the next chunk (clearing it) once the current one is
    /// full, unless doing so would recycle a chunk younger than
    /// [`MIN_CHUNK_AGE`] — in which case we keep appending to the current
    /// chunk rather than risk losing routes too early.
    fn advance_if_full(&mut self) {
        if self.chunks[self.current].entries.len() < CHUNK_CAPACITY {
            return;
        }
        let next = (self.current + 1) % self.chunks.len();
        let now = Instant::now();
        if now.duration_since(self.chunks[next].started_at) < MIN_CHUNK_AGE {
            tracing::warn!(
                chunk = next,
                "provenance table chunk wrap deferred, under minimum age"
            );
            return;
        }
        self.chunks[next] = Chunk::new(now);
        self.current = next;
    }

    /// Drop `peer` from every entry's route list (used when a peer
    /// disconnects and we want routes to stop resolving to it promptly,
    /// rather than waiting on the generational handle to simply miss).
    /// Entries themselves are kept, since other peers may still hold a
    /// live route to the same MUID.
    pub fn drop_routes_from(&mut self, peer: PeerHandle) {
        for chunk in &mut self.chunks {
            for entry in chunk.entries.values_mut() {
                entry.routes.retain(|&p| p != peer);
            }
        }
    }
}

impl Default for ProvenanceTable {
    fn default() -> Self {
        Self::new()
    }
}
