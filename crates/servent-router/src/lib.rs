//! The message router: provenance tracking, duplicate detection, reply
//! back-routing, and push routing for the Gnutella message plane.

pub mod peer;
pub mod provenance;
pub mod push;

use servent_wire::header::Muid;

pub use peer::{PeerHandle, PeerTable};
pub use provenance::{ProvenanceTable, RouteEntry};
pub use push::{PushDecision, PushRouter};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("duplicate message, already routed: {0:02x?}")]
    Duplicate(Muid),

    #[error("no route known for reply muid {0:02x?}")]
    NoRoute(Muid),
}

pub type Result<T> = std::result::Result<T, RouterError>;

/// What to do with an inbound request after recording its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// First time we've seen this MUID; forward it.
    Forward,
    /// We've already routed a request with this MUID; drop it.
    Duplicate,
}

/// Ties together the provenance table and push router against a shared
/// peer arena. Owned by the core event loop; not `Sync` (the core runs
/// single-threaded per connection set, per the concurrency model).
pub struct Router<P> {
    pub peers: PeerTable<P>,
    provenance: ProvenanceTable,
    push: PushRouter,
}

impl<P> Router<P> {
    pub fn new() -> Self {
        Self {
            peers: PeerTable::new(),
            provenance: ProvenanceTable::new(),
            push: PushRouter::new(),
        }
    }

    /// Record an inbound request (Ping or Query), returning whether it is
    /// new or a duplicate of one already routed. A duplicate from a
    /// second peer still appends that peer to the route list rather than
    /// being dropped silently.
    pub fn record_request(&mut self, muid: Muid, from: Option<PeerHandle>) -> RequestOutcome {
        if self.provenance.record(muid, from) {
            RequestOutcome::Forward
        } else {
            RequestOutcome::Duplicate
        }
    }

    /// Resolve the peer a reply (Pong or Query Hit) with `muid` should be
    /// routed back to: the first live peer in the route list. `None`
    /// means the request originated locally and should be answered here.
    pub fn route_reply(&self, muid: &Muid) -> Result<Option<PeerHandle>> {
        let entry = self
            .provenance
            .lookup(muid)
            .ok_or(RouterError::NoRoute(*muid))?;
        if let Some(peer) = entry.routes.iter().copied().find(|&p| self.peers.is_live(p)) {
            return Ok(Some(peer));
        }
        if entry.local_origin {
            return Ok(None);
        }
        Err(RouterError::NoRoute(*muid))
    }

    /// Record the servent id a Query Hit carried, so a later Push for one
    /// of its files can be routed without waiting on a second hit.
    pub fn save_query_hit_provenance(&mut self, muid: &Muid, servent_id: [u8; 16]) {
        self.provenance.save_query_hit_provenance(muid, servent_id);
    }

    /// Remember that a Query Hit from `servent_id` passed through `peer`,
    /// for Push back-routing.
    pub fn record_push_route(&mut self, servent_id: [u8; 16], peer: PeerHandle) {
        self.push.record_route(servent_id, peer);
    }

    pub fn decide_push(&self, target: &[u8; 16]) -> PushDecision {
        self.push.decide(target)
    }

    pub fn ban_guid(&mut self, guid: [u8; 16]) {
        self.push.ban(guid);
    }

    pub fn is_banned(&self, guid: &[u8; 16]) -> bool {
        self.push.is_banned(guid)
    }

    /// Tear down a peer: remove it from the arena and scrub every route
    /// that pointed at it, so reply routing and push routing both fail
    /// cleanly instead of resolving to a dead handle.
    pub fn disconnect(&mut self, handle: PeerHandle) -> Option<P> {
        self.provenance.drop_routes_from(handle);
        self.push.drop_routes_from(handle);
        self.peers.remove(handle)
    }
}

impl<P> Default for Router<P> {
    fn default() -> Self {
        Self::new()
    }
}
