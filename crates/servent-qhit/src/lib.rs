//! The query hit packet builder.
//!
//! Earlier servents built a query hit in one static, process-global
//! scratch buffer, opened and closed around each search's match loop.
//! Here the builder is an owned, task-local value: a [`QhitBuilder`] is
//! constructed per search, fed matches with [`QhitBuilder::add_result`],
//! and consumed by [`QhitBuilder::finish`] — the open/close discipline is
//! enforced by ownership (you cannot add a result to a builder you've
//! already finished) rather than by a runtime "is this buffer open" flag.

use servent_messages::queryhit::{HitRecord, QueryHit};
use servent_wire::ggep::Extension;

pub mod base32;

/// Above this many bytes of accumulated record data, a packet is closed
/// out and a new one started rather than growing further.
pub const QHIT_SIZE_THRESHOLD: usize = 2016;
/// A packet's hit count is a single byte, so this is a hard ceiling
/// independent of size.
pub const QHIT_MAX_RESULTS: usize = 255;
/// At most this many alt-locs are carried per result.
pub const QHIT_MAX_ALT: usize = 15;
/// At most this many push-proxy addresses are carried in the trailer.
pub const QHIT_MAX_PROXIES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum QhitError {
    #[error("too many push-proxy addresses: {0} > {QHIT_MAX_PROXIES}")]
    TooManyProxies(usize),

    #[error(transparent)]
    Message(#[from] servent_messages::MessageError),
}

pub type Result<T> = std::result::Result<T, QhitError>;

/// One match to add to the builder, in source form (a SHA-1 digest rather
/// than an already-framed `"H"` extension).
pub struct Match {
    pub file_index: u32,
    pub file_size: u64,
    pub file_name: String,
    pub sha1: Option<[u8; 20]>,
    pub alt_locs: Vec<([u8; 4], u16)>,
}

fn match_extensions(m: &Match) -> Option<Vec<Extension>> {
    let mut exts = Vec::new();
    if let Some(sha1) = m.sha1 {
        let mut data = vec![0x01]; // SHA-1 type marker
        data.extend_from_slice(&sha1);
        exts.push(Extension::new("H", data));
    }
    if !m.alt_locs.is_empty() {
        let capped = &m.alt_locs[..m.alt_locs.len().min(QHIT_MAX_ALT)];
        let mut data = Vec::with_capacity(capped.len() * 6);
        for (ip, port) in capped {
            data.extend_from_slice(ip);
            data.extend_from_slice(&port.to_le_bytes());
        }
        exts.push(Extension::new("ALT", data));
    }
    if m.file_size >= servent_messages::queryhit::LARGE_FILE_THRESHOLD {
        exts.push(Extension::new("LF", servent_wire::ggep::lf::encode(m.file_size)));
    }
    if exts.is_empty() {
        None
    } else {
        Some(exts)
    }
}

/// Rough size contribution of a match once encoded, used to decide when
/// a packet is full. Doesn't need to be exact, only monotonic with the
/// real encoded size.
fn estimated_size(m: &Match) -> usize {
    8 + m.file_name.len() + 2
        + m.sha1.map_or(0, |_| 21 + 8)
        + m.alt_locs.len().min(QHIT_MAX_ALT) * 6
}

/// Owned, per-search query hit builder.
pub struct QhitBuilder {
    port: u16,
    ip: [u8; 4],
    speed: u32,
    vendor_code: [u8; 4],
    open_flags: u8,
    servent_id: [u8; 16],
    push_proxies: Vec<([u8; 4], u16)>,
    pending: Vec<HitRecord>,
    pending_size: usize,
    finished: Vec<QueryHit>,
}

impl QhitBuilder {
    pub fn new(port: u16, ip: [u8; 4], speed: u32, vendor_code: [u8; 4], servent_id: [u8; 16]) -> Self {
        Self {
            port,
            ip,
            speed,
            vendor_code,
            open_flags: 0,
            servent_id,
            push_proxies: Vec::new(),
            pending: Vec::new(),
            pending_size: 0,
            finished: Vec::new(),
        }
    }

    /// Set the push-proxy addresses carried in every packet's trailer.
    /// Rejects more than [`QHIT_MAX_PROXIES`] rather than silently
    /// truncating, since the caller picked that list and should know it
    /// shrank.
    pub fn set_push_proxies(&mut self, proxies: Vec<([u8; 4], u16)>) -> Result<()> {
        if proxies.len() > QHIT_MAX_PROXIES {
            return Err(QhitError::TooManyProxies(proxies.len()));
        }
        self.push_proxies = proxies;
        self.open_flags |= if self.push_proxies.is_empty() { 0 } else { 0x01 };
        Ok(())
    }

    /// Add a matched file. Closes out the current packet first if adding
    /// this match would exceed [`QHIT_SIZE_THRESHOLD`] or
    /// [`QHIT_MAX_RESULTS`], so every finished packet stays within limits.
    pub fn add_result(&mut self, m: Match) -> Result<()> {
        let size = estimated_size(&m);
        if !self.pending.is_empty()
            && (self.pending.len() >= QHIT_MAX_RESULTS || self.pending_size + size > QHIT_SIZE_THRESHOLD)
        {
            self.close_current()?;
        }
        let extensions = match_extensions(&m);
        self.pending.push(HitRecord {
            file_index: m.file_index,
            file_size: m.file_size,
            file_name: m.file_name,
            extensions,
        });
        self.pending_size += size;
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let trailer_ggep = self.trailer_extensions();
        let hit = QueryHit {
            port: self.port,
            ip: self.ip,
            speed: self.speed,
            records: std::mem::take(&mut self.pending),
            vendor_code: self.vendor_code,
            open_flags: self.open_flags,
            trailer_ggep,
            servent_id: self.servent_id,
        };
        self.pending_size = 0;
        self.finished.push(hit);
        Ok(())
    }

    fn trailer_extensions(&self) -> Option<Vec<Extension>> {
        if self.push_proxies.is_empty() {
            return None;
        }
        let mut data = Vec::with_capacity(self.push_proxies.len() * 6);
        for (ip, port) in &self.push_proxies {
            data.extend_from_slice(ip);
            data.extend_from_slice(&port.to_le_bytes());
        }
        Some(vec![Extension::new("PUSH", data)])
    }

    /// Consume the builder, closing out any pending packet and returning
    /// every finished [`QueryHit`] in emission order.
    pub fn finish(mut self) -> Result<Vec<QueryHit>> {
        self.close_current()?;
        Ok(self.finished)
    }
}
