//! The core event loop's state: everything the four subsystems need,
//! owned in one place and driven by whatever async I/O layer
//! (`servent-daemon`) reads bytes off the wire.

use std::collections::HashSet;
use std::time::Duration;

use servent_messages::{Pong, Push, QueryHit, VendorFrame};
use servent_pongcache::{admit_ping, admit_pong, CachedPong, PingAdmission, PongCache, PongCacheConfig, PongDemux};
use servent_query::{AdmissionOutcome, QrelayedWindow, QseenTable, QueryAdmissionConfig};
use servent_router::{PeerHandle, PushDecision, RequestOutcome, Router};
use servent_vendor::VendorMessage;
use servent_wire::header::Muid;

use crate::error::{CoreError, Result};
use crate::peer::Peer;

#[derive(Clone, Debug)]
pub struct CoreConfig {
    pub max_ttl: u8,
    pub pong_cache: PongCacheConfig,
    /// Our own externally-visible address, so a pong pointing back at
    /// ourselves is never cached.
    pub self_ip: [u8; 4],
    /// Addresses known to be hostile; pongs pointing at them are dropped
    /// rather than cached, and out-of-band query replies never go to
    /// them either.
    pub hostile_ips: HashSet<[u8; 4]>,
    /// Window within which a peer's repeated search is suppressed as a
    /// first-hop re-query.
    pub requery_threshold: Duration,
    /// Whether this node is itself behind a firewall/NAT without an
    /// open push route.
    pub self_firewalled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_ttl: 7,
            pong_cache: PongCacheConfig::default(),
            self_ip: [0, 0, 0, 0],
            hostile_ips: HashSet::new(),
            requery_threshold: Duration::from_secs(30),
            self_firewalled: false,
        }
    }
}

pub struct CoreContext {
    pub router: Router<Peer>,
    pub pong_cache: PongCache,
    pub demux: PongDemux,
    pub qrelayed: QrelayedWindow,
    pub qseen: QseenTable,
    pub guid: [u8; 16],
    pub config: CoreConfig,
}

impl CoreContext {
    pub fn new(guid: [u8; 16], config: CoreConfig) -> Self {
        Self {
            router: Router::new(),
            pong_cache: PongCache::new(config.pong_cache.clone()),
            demux: PongDemux::new(),
            qrelayed: QrelayedWindow::new(),
            qseen: QseenTable::new(),
            guid,
            config,
        }
    }

    /// Handle an inbound ping: record provenance, decide admission, and
    /// return a sample of cached pongs to answer with.
    pub fn handle_ping(
        &mut self,
        from: Option<PeerHandle>,
        muid: Muid,
        hops: u8,
        ttl: u8,
        is_crawler: bool,
        rng: &mut impl rand::Rng,
    ) -> (PingAdmission, Vec<CachedPong>) {
        if self.router.record_request(muid, from) == RequestOutcome::Duplicate {
            tracing::debug!(?muid, "duplicate ping dropped");
            return (PingAdmission::Throttled, Vec::new());
        }

        let (dup, total) = from
            .and_then(|h| self.router.peers.get(h))
            .map(|p| (p.recent_duplicate_ping_count, p.recent_ping_count))
            .unwrap_or((0, 0));

        let admission = admit_ping(hops, ttl, is_crawler, dup, total, &self.config.pong_cache);
        let pongs = match admission {
            PingAdmission::Throttled => Vec::new(),
            _ => self
                .pong_cache
                .sample(hops, self.config.pong_cache.max_pongs, rng),
        };
        (admission, pongs)
    }

    /// Handle an inbound pong: cache it if sane, and resolve where the
    /// reply should be forwarded.
    pub fn handle_pong(&mut self, muid: &Muid, hops: u8, pong: &Pong) -> Result<Option<PeerHandle>> {
        if admit_pong(pong.ip, pong.port, self.config.self_ip, &self.config.hostile_ips) {
            self.pong_cache.insert(
                CachedPong {
                    ip: pong.ip,
                    port: pong.port,
                    files_shared: pong.files_shared,
                    kb_shared: pong.kb_shared,
                    is_ultra: pong.is_ultrapeer(),
                    cached_at: std::time::Instant::now(),
                },
                hops,
            );
        }
        Ok(self.router.route_reply(muid)?)
    }

    /// Run an inbound query through the admission pipeline.
    pub fn handle_query(
        &mut self,
        muid: Muid,
        query: servent_messages::Query,
        hops: u8,
        ttl: u8,
        from: PeerHandle,
    ) -> AdmissionOutcome {
        let admission_config = QueryAdmissionConfig {
            max_ttl: self.config.max_ttl,
            requery_threshold: self.config.requery_threshold,
            self_firewalled: self.config.self_firewalled,
        };
        servent_query::admit(
            muid,
            query,
            hops,
            ttl,
            from,
            std::time::Instant::now(),
            &admission_config,
            &self.config.hostile_ips,
            &mut self.qrelayed,
            &mut self.qseen,
        )
    }

    /// Handle an inbound query hit: record its servent-id provenance for
    /// later push routing, and resolve where to forward the reply.
    pub fn handle_query_hit(
        &mut self,
        muid: &Muid,
        from: Option<PeerHandle>,
        hit: &QueryHit,
    ) -> Result<Option<PeerHandle>> {
        self.router.save_query_hit_provenance(muid, hit.servent_id);
        if let Some(peer) = from {
            self.router.record_push_route(hit.servent_id, peer);
        }
        Ok(self.router.route_reply(muid)?)
    }

    /// Decide how to route an inbound push request.
    pub fn handle_push(&self, push: &Push) -> PushDecision {
        if self.router.is_banned(&push.servent_id) {
            return PushDecision::Banned;
        }
        self.router.decide_push(&push.servent_id)
    }

    /// Dispatch an inbound vendor message frame.
    pub fn handle_vendor(&self, frame: &VendorFrame) -> Result<VendorMessage> {
        servent_vendor::handle(frame).map_err(CoreError::Vendor)
    }

    pub fn disconnect(&mut self, handle: PeerHandle) -> Option<Peer> {
        self.router.disconnect(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Direction;
    use std::net::SocketAddr;

    fn new_ctx() -> CoreContext {
        CoreContext::new([1u8; 16], CoreConfig::default())
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:6346".parse().unwrap()
    }

    #[test]
    fn ping_first_time_admitted_standard() {
        let mut ctx = new_ctx();
        let peer = ctx.router.peers.insert(Peer::new(addr(), Direction::Inbound));
        let mut rng = rand::thread_rng();
        let (admission, _) = ctx.handle_ping(Some(peer), [1u8; 16], 1, 5, false, &mut rng);
        assert_eq!(admission, PingAdmission::Standard { forward: true });
    }

    #[test]
    fn duplicate_ping_throttled() {
        let mut ctx = new_ctx();
        let peer = ctx.router.peers.insert(Peer::new(addr(), Direction::Inbound));
        let mut rng = rand::thread_rng();
        ctx.handle_ping(Some(peer), [2u8; 16], 1, 5, false, &mut rng);
        let (admission, pongs) = ctx.handle_ping(Some(peer), [2u8; 16], 1, 5, false, &mut rng);
        assert_eq!(admission, PingAdmission::Throttled);
        assert!(pongs.is_empty());
    }

    #[test]
    fn pong_routes_back_to_requester() {
        let mut ctx = new_ctx();
        let peer = ctx.router.peers.insert(Peer::new(addr(), Direction::Inbound));
        ctx.router.record_request([3u8; 16], Some(peer));
        let pong = Pong {
            port: 6346,
            ip: [1, 2, 3, 4],
            files_shared: 1,
            kb_shared: 16,
            ggep: None,
        };
        let route = ctx.handle_pong(&[3u8; 16], 1, &pong).unwrap();
        assert_eq!(route, Some(peer));
    }

    #[test]
    fn query_hit_feeds_push_routing() {
        let mut ctx = new_ctx();
        let peer = ctx.router.peers.insert(Peer::new(addr(), Direction::Inbound));
        ctx.router.record_request([4u8; 16], Some(peer));
        let hit = QueryHit {
            servent_id: [9u8; 16],
            ..Default::default()
        };
        ctx.handle_query_hit(&[4u8; 16], Some(peer), &hit).unwrap();
        let push = Push {
            servent_id: [9u8; 16],
            file_index: 0,
            ip: [0, 0, 0, 0],
            port: 0,
        };
        assert_eq!(ctx.handle_push(&push), PushDecision::Forward(vec![peer]));
    }
}
