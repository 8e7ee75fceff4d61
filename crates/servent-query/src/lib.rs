//! Query admission and routing pipeline: parsing, text compaction, URN
//! extraction, hop/TTL discipline, and the duplicate suppression that sits
//! in front of the message router's own provenance table.

pub mod dedup;
pub mod hops;
pub mod qseen;
pub mod text;
pub mod urn;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use servent_messages::query::Query;
use servent_router::PeerHandle;
use servent_wire::header::Muid;

pub use dedup::QrelayedWindow;
pub use hops::Forwarding;
pub use qseen::QseenTable;

/// Overhead-only prefixes some clients send with no real search payload
/// behind them; rejected outright rather than forwarded for nothing.
const OVERHEAD_PREFIXES: &[&str] = &["QTRAX2_CONNECTION"];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("search text is empty after compaction")]
    EmptyAfterCompaction,

    #[error("search text carries an overhead-only prefix with no payload")]
    OverheadOnlyPrefix,

    #[error("search text starts with a known overhead prefix")]
    KnownOverheadPrefix,

    #[error("hops already exceed max ttl, reply could never reach the originator")]
    HopsExceedMaxTtl,

    #[error("out-of-band return address is in the hostiles set")]
    HostileReturnAddress,
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Static tunables for one admission pass, independent of the message
/// at hand.
#[derive(Clone, Debug)]
pub struct QueryAdmissionConfig {
    pub max_ttl: u8,
    /// Window within which a repeat search from the same peer is
    /// suppressed as a first-hop re-query rather than re-admitted.
    pub requery_threshold: Duration,
    /// Whether this node is itself firewalled. Combined with the
    /// query's own firewalled flag to decide whether a local hit should
    /// be answered at all.
    pub self_firewalled: bool,
}

/// What the pipeline decided to do with an inbound query.
#[derive(Debug, PartialEq)]
pub enum AdmissionOutcome {
    Duplicate,
    Rejected(QueryError),
    Accepted {
        compacted: Query,
        sha1: Option<[u8; 20]>,
        forwarding: Forwarding,
        /// Set if the requester asked for an out-of-band reply and the
        /// return address extracted from the MUID passed the hostile
        /// check.
        out_of_band_to: Option<([u8; 4], u16)>,
        /// Both ends are firewalled; a local hit should not be answered
        /// since neither side could open a push connection to the
        /// other.
        suppress_local_reply: bool,
    },
}

/// A minimum-speed prefix of all zero bytes with no search text at all
/// carries no useful payload and is rejected outright rather than
/// forwarded for nothing.
fn has_overhead_only_prefix(search: &str) -> bool {
    search.trim().is_empty()
}

fn has_known_overhead_prefix(search: &str) -> bool {
    OVERHEAD_PREFIXES.iter().any(|p| search.starts_with(p))
}

/// Recover the out-of-band reply address carried in a query's MUID: the
/// first four octets are the IPv4 address, the next two (little-endian)
/// the port.
fn out_of_band_address(muid: &Muid) -> Option<([u8; 4], u16)> {
    let ip = [muid[0], muid[1], muid[2], muid[3]];
    let port = u16::from_le_bytes([muid[4], muid[5]]);
    if port == 0 {
        None
    } else {
        Some((ip, port))
    }
}

/// Run one inbound query through the pipeline: overhead-prefix
/// rejection, text compaction, URN extraction, hop/TTL discipline,
/// first-hop re-query suppression, multi-hop duplicate suppression, and
/// out-of-band/firewall flag handling. Does not itself consult the
/// message router's provenance table — that's a separate, coarser
/// duplicate check the caller applies first.
pub fn admit(
    muid: Muid,
    mut query: Query,
    hops: u8,
    ttl: u8,
    from: PeerHandle,
    now: Instant,
    config: &QueryAdmissionConfig,
    hostile: &HashSet<[u8; 4]>,
    window: &mut QrelayedWindow,
    qseen: &mut QseenTable,
) -> AdmissionOutcome {
    if has_overhead_only_prefix(&query.search) {
        return AdmissionOutcome::Rejected(QueryError::OverheadOnlyPrefix);
    }
    if has_known_overhead_prefix(&query.search) {
        return AdmissionOutcome::Rejected(QueryError::KnownOverheadPrefix);
    }

    let sha1 = urn::extract_sha1_urn(&query.search);

    text::compact(&mut query.search);
    if query.search.trim().is_empty() && sha1.is_none() {
        return AdmissionOutcome::Rejected(QueryError::EmptyAfterCompaction);
    }

    if hops > config.max_ttl {
        return AdmissionOutcome::Rejected(QueryError::HopsExceedMaxTtl);
    }

    let requery_key = sha1.map(hex::encode).unwrap_or_else(|| query.search.clone());
    if !qseen.record(from, &requery_key, now, config.requery_threshold) {
        return AdmissionOutcome::Duplicate;
    }

    let relay_key = dedup::relay_key(hops, ttl, &query.search);
    if !window.record(relay_key) {
        return AdmissionOutcome::Duplicate;
    }

    let mut out_of_band_to = None;
    if query.wants_out_of_band() {
        match out_of_band_address(&muid) {
            Some(addr) if !hostile.contains(&addr.0) => out_of_band_to = Some(addr),
            Some(_) => return AdmissionOutcome::Rejected(QueryError::HostileReturnAddress),
            None => {}
        }
    }
    let suppress_local_reply = query.is_firewalled() && config.self_firewalled;

    let forwarding = hops::discipline(hops, ttl, config.max_ttl);

    AdmissionOutcome::Accepted {
        compacted: query,
        sha1,
        forwarding,
        out_of_band_to,
        suppress_local_reply,
    }
}
