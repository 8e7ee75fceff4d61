//! Persisted servent GUID.
//!
//! A 16-octet identifier, in the modern marked form: byte 8 is `0xFF` and
//! byte 15 is `0x00`, leaving the remaining 14 bytes random. Read from the
//! daemon's data directory on startup; regenerated whenever the file is
//! absent, the wrong length, missing the marker bytes, or collides with
//! the banned-GUID set.

use std::path::Path;

use rand::RngCore;

pub const GUID_LEN: usize = 16;
pub const GUID_FILE_NAME: &str = "servent.guid";

#[derive(Debug, thiserror::Error)]
pub enum GuidError {
    #[error("I/O error reading/writing GUID file: {0}")]
    Io(#[from] std::io::Error),
}

/// Generate a fresh, well-formed GUID.
pub fn generate() -> [u8; GUID_LEN] {
    let mut guid = [0u8; GUID_LEN];
    rand::thread_rng().fill_bytes(&mut guid);
    mark(&mut guid);
    guid
}

fn mark(guid: &mut [u8; GUID_LEN]) {
    guid[8] = 0xFF;
    guid[15] = 0x00;
}

fn is_well_formed(guid: &[u8; GUID_LEN]) -> bool {
    guid[8] == 0xFF && guid[15] == 0x00
}

/// Load the persisted GUID from `path`, generating and persisting a fresh
/// one if the file is missing, malformed, or `is_banned` reports a
/// collision.
pub fn load_or_create(
    path: &Path,
    is_banned: impl Fn(&[u8; GUID_LEN]) -> bool,
) -> Result<[u8; GUID_LEN], GuidError> {
    if let Ok(bytes) = std::fs::read(path) {
        if bytes.len() == GUID_LEN {
            let mut guid = [0u8; GUID_LEN];
            guid.copy_from_slice(&bytes);
            if is_well_formed(&guid) && !is_banned(&guid) {
                return Ok(guid);
            }
            tracing::warn!("persisted GUID malformed or banned, regenerating");
        } else {
            tracing::warn!(len = bytes.len(), "persisted GUID file has wrong length, regenerating");
        }
    }

    let mut guid = generate();
    while is_banned(&guid) {
        guid = generate();
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, guid)?;
    Ok(guid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_guid_is_well_formed() {
        let guid = generate();
        assert!(is_well_formed(&guid));
    }

    #[test]
    fn load_or_create_persists_and_reloads() {
        let dir = std::env::temp_dir().join(format!("servent-guid-test-{:x}", rand::random::<u64>()));
        let path = dir.join(GUID_FILE_NAME);
        let first = load_or_create(&path, |_| false).unwrap();
        let second = load_or_create(&path, |_| false).unwrap();
        assert_eq!(first, second);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn banned_guid_forces_regeneration() {
        let dir = std::env::temp_dir().join(format!("servent-guid-banned-{:x}", rand::random::<u64>()));
        let path = dir.join(GUID_FILE_NAME);
        let first = load_or_create(&path, |_| false).unwrap();
        let second = load_or_create(&path, |g| *g == first).unwrap();
        assert_ne!(first, second);
        std::fs::remove_dir_all(dir).ok();
    }
}
