//! Generational peer handles.
//!
//! gtk-gnutella's routing table keeps raw back-pointers into `struct
//! gnutella_node` and nulls them out (with a reference count) when a peer
//! disconnects mid-route. A generational arena gets the same "a stale
//! route silently becomes a no-op" property without the node needing to
//! know who is pointing at it: a route just holds an `(index, generation)`
//! pair, and `PeerTable::get` returns `None` once that slot has been
//! reused for someone else.

use std::collections::HashMap;

/// A stable reference to a connected peer. Cheap to copy, cheap to store
/// in route tables; becomes a no-op lookup once the peer disconnects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerHandle {
    index: u32,
    generation: u32,
}

struct Slot<P> {
    generation: u32,
    peer: Option<P>,
}

/// An arena of connected peers, indexed by [`PeerHandle`].
#[derive(Default)]
pub struct PeerTable<P> {
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    by_guid: HashMap<[u8; 16], PeerHandle>,
}

impl<P> PeerTable<P> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_guid: HashMap::new(),
        }
    }

    /// Register a newly connected peer, returning a handle for it.
    pub fn insert(&mut self, peer: P) -> PeerHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.peer = Some(peer);
            PeerHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                peer: Some(peer),
            });
            PeerHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Register a peer under a servent GUID, so push routing can later
    /// find it by GUID alone.
    pub fn insert_with_guid(&mut self, guid: [u8; 16], peer: P) -> PeerHandle {
        let handle = self.insert(peer);
        self.by_guid.insert(guid, handle);
        handle
    }

    pub fn get(&self, handle: PeerHandle) -> Option<&P> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.peer.as_ref())
    }

    pub fn get_mut(&mut self, handle: PeerHandle) -> Option<&mut P> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.peer.as_mut())
    }

    pub fn by_guid(&self, guid: &[u8; 16]) -> Option<PeerHandle> {
        self.by_guid.get(guid).copied()
    }

    /// Tear down a peer: bumps the slot's generation so every outstanding
    /// [`PeerHandle`] into it becomes dead, and frees the slot for reuse.
    pub fn remove(&mut self, handle: PeerHandle) -> Option<P> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let peer = slot.peer.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.by_guid.retain(|_, h| *h != handle);
        Some(peer)
    }

    pub fn is_live(&self, handle: PeerHandle) -> bool {
        self.get(handle).is_some()
    }
}
