//! Vendor message dispatch table.
//!
//! gtk-gnutella's `vmsg.c` keeps a flat array sorted by `(vendor, id,
//! version)` and looks up "the handler with the greatest version not
//! exceeding the message's version" rather than an exact-match map, so
//! that an older handler can still answer a newer peer's message. We
//! mirror that shape instead of a `HashMap`, since a handful of entries
//! never benefits from hashing and the greatest-version-below search is
//! naturally a sorted-slice scan.

use servent_messages::VendorFrame;

use crate::codes::{self, VendorCode};

/// The named vendor messages this servent understands, grouped the way
/// `vmsg_map` groups them: vendor-neutral first, then per-vendor blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    MessagesSupported,
    HopsFlow,
    ConnectBack,
    QueryStatusRequest,
    QueryStatusResponse,
    PushProxyRequest,
    PushProxyAck,
}

struct Entry {
    vendor: VendorCode,
    selector: u16,
    version: u16,
    kind: Kind,
}

/// Sorted by `(vendor, selector, version)`, ascending. Kept as a `const`
/// array rather than built at startup, matching `vmsg_map`'s static table.
const TABLE: &[Entry] = &[
    Entry {
        vendor: codes::T_0000,
        selector: 0x0000,
        version: 0x0000,
        kind: Kind::MessagesSupported,
    },
    Entry {
        vendor: codes::T_BEAR,
        selector: 0x0004,
        version: 0x0001,
        kind: Kind::HopsFlow,
    },
    Entry {
        vendor: codes::T_BEAR,
        selector: 0x0007,
        version: 0x0001,
        kind: Kind::ConnectBack,
    },
    Entry {
        vendor: codes::T_BEAR,
        selector: 0x000b,
        version: 0x0001,
        kind: Kind::QueryStatusRequest,
    },
    Entry {
        vendor: codes::T_BEAR,
        selector: 0x000c,
        version: 0x0001,
        kind: Kind::QueryStatusResponse,
    },
    Entry {
        vendor: codes::T_LIME,
        selector: 0x0015,
        version: 0x0002,
        kind: Kind::PushProxyRequest,
    },
    Entry {
        vendor: codes::T_LIME,
        selector: 0x0016,
        version: 0x0002,
        kind: Kind::PushProxyAck,
    },
];

/// Find the handler kind for a frame: among entries matching `(vendor,
/// selector)`, the one with the greatest `version` not exceeding the
/// frame's version. Returns `None` if no entry's version is low enough,
/// or no entry matches at all.
pub fn lookup(frame: &VendorFrame) -> Option<Kind> {
    TABLE
        .iter()
        .filter(|e| e.vendor == frame.vendor && e.selector == frame.selector)
        .filter(|e| e.version <= frame.version)
        .max_by_key(|e| e.version)
        .map(|e| e.kind)
}
