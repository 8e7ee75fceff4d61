//! Per-connection peer state held by the router's peer arena.

use std::net::SocketAddr;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Everything the core tracks about one connected servent.
#[derive(Clone, Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    pub direction: Direction,
    pub servent_id: Option<[u8; 16]>,
    pub is_ultrapeer: bool,
    pub connected_at: Instant,
    /// Recent ping count, used by the pong cache's throttle admission.
    pub recent_ping_count: u32,
    pub recent_duplicate_ping_count: u32,
}

impl Peer {
    pub fn new(addr: SocketAddr, direction: Direction) -> Self {
        Self {
            addr,
            direction,
            servent_id: None,
            is_ultrapeer: false,
            connected_at: Instant::now(),
            recent_ping_count: 0,
            recent_duplicate_ping_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_peer_has_no_servent_id_yet() {
        let addr: SocketAddr = "127.0.0.1:6346".parse().unwrap();
        let peer = Peer::new(addr, Direction::Inbound);
        assert_eq!(peer.servent_id, None);
        assert!(!peer.is_ultrapeer);
    }
}
