//! GGEP: the Gnutella Generic Extension Protocol.
//!
//! A GGEP block is a sequence of extensions, each shaped
//! `[ flags | id-length-bits | id | data-length (varint) | data ]`, led by a
//! single magic byte. The last extension in the block carries the `LAST`
//! flag instead of the block carrying an explicit count.
//!
//! The `lf` submodule implements the integer encoding used inside the "LF"
//! (large file length) extension's data segment, which is a distinct,
//! narrower varint from the block-framing length field above it.

use crate::{Result, WireError};

/// Leading byte of a GGEP block.
pub const GGEP_MAGIC: u8 = 0xC3;

const FLAG_LAST: u8 = 0x80;
const FLAG_COBS: u8 = 0x40;
const FLAG_DEFLATE: u8 = 0x20;
const ID_LEN_MASK: u8 = 0x07;

/// One decoded GGEP extension: a name (e.g. `"H"`, `"ALT"`, `"LF"`) and its
/// (already COBS/deflate-decoded) data segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub id: String,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Parse a full GGEP block (including its leading [`GGEP_MAGIC`] byte).
pub fn parse_block(buf: &[u8]) -> Result<Vec<Extension>> {
    if buf.is_empty() || buf[0] != GGEP_MAGIC {
        return Err(WireError::MalformedGgep("missing GGEP magic byte".into()));
    }
    let mut pos = 1;
    let mut out = Vec::new();

    loop {
        if pos >= buf.len() {
            return Err(WireError::MalformedGgep("block truncated before LAST flag".into()));
        }
        let flags = buf[pos];
        pos += 1;
        let id_len = (flags & ID_LEN_MASK) as usize;
        if id_len == 0 {
            return Err(WireError::MalformedGgep("zero-length extension id".into()));
        }
        if pos + id_len > buf.len() {
            return Err(WireError::MalformedGgep("extension id runs past end of block".into()));
        }
        let id = String::from_utf8(buf[pos..pos + id_len].to_vec())
            .map_err(|_| WireError::MalformedGgep("non-UTF-8 extension id".into()))?;
        pos += id_len;

        let (data_len, consumed) = decode_length(&buf[pos..])?;
        pos += consumed;
        if pos + data_len > buf.len() {
            return Err(WireError::MalformedGgep("extension data runs past end of block".into()));
        }
        let mut data = buf[pos..pos + data_len].to_vec();
        pos += data_len;

        if flags & FLAG_COBS != 0 {
            data = crate::cobs::decode(&data)?;
        }
        if flags & FLAG_DEFLATE != 0 {
            return Err(WireError::MalformedGgep(
                "deflated GGEP extensions are not supported".into(),
            ));
        }

        out.push(Extension::new(id, data));

        if flags & FLAG_LAST != 0 {
            break;
        }
    }
    Ok(out)
}

/// Serialize a full GGEP block, including the leading magic byte.
///
/// `cobs_ids` names the extensions (by id) whose data segment should be
/// COBS-encoded before framing, mirroring the policy a query hit builder
/// applies to binary-heavy extensions.
pub fn write_block(extensions: &[Extension], cobs_ids: &[&str]) -> Result<Vec<u8>> {
    let mut out = vec![GGEP_MAGIC];
    let count = extensions.len();
    for (i, ext) in extensions.iter().enumerate() {
        let id_bytes = ext.id.as_bytes();
        if id_bytes.is_empty() || id_bytes.len() > ID_LEN_MASK as usize {
            return Err(WireError::OutOfRange(format!(
                "extension id '{}' must be 1-7 bytes",
                ext.id
            )));
        }

        let use_cobs = cobs_ids.contains(&ext.id.as_str());
        let data = if use_cobs {
            crate::cobs::encode(&ext.data)
        } else {
            ext.data.clone()
        };

        let mut flags = id_bytes.len() as u8;
        if use_cobs {
            flags |= FLAG_COBS;
        }
        if i + 1 == count {
            flags |= FLAG_LAST;
        }

        out.push(flags);
        out.extend_from_slice(id_bytes);
        out.extend_from_slice(&encode_length(data.len()));
        out.extend_from_slice(&data);
    }
    Ok(out)
}

/// The block-framing data-length varint: little-endian base-128, high bit
/// of a byte set iff another byte follows. Distinct from the `lf` encoding
/// below, which is used only inside an `"LF"` extension's own data.
fn encode_length(mut len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (len & 0x7f) as u8;
        len >>= 7;
        if len != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
    out
}

fn decode_length(buf: &[u8]) -> Result<(usize, usize)> {
    let mut value: usize = 0;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        value |= ((b & 0x7f) as usize) << shift;
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
        if shift > 28 {
            return Err(WireError::MalformedGgep("data-length varint too long".into()));
        }
    }
    Err(WireError::MalformedGgep("data-length varint truncated".into()))
}

/// The integer encoding used inside the `"LF"` GGEP extension's data
/// segment (declared file length), grounded byte-for-byte in gtk-gnutella's
/// `ggep_lf_encode`/`ggept_lf_extract`.
pub mod lf {
    use crate::{Result, WireError};

    /// Encode `value` the way `ggep_lf_encode` does: emit 7-bit groups,
    /// every byte (including the last) carrying the `0x80` marker bit, in a
    /// do/while loop that always emits at least one byte.
    pub fn encode(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = ((value & 0x7f) as u8) | 0x80;
            out.push(byte);
            value >>= 7;
            if value == 0 {
                break;
            }
        }
        out
    }

    /// Decode an `"LF"` data segment. Every byte must carry the `0x80`
    /// marker; a trailing all-zero group (after stripping the marker) is
    /// rejected as non-canonical unless the whole encoding is one byte.
    pub fn decode(data: &[u8]) -> Result<u64> {
        if data.is_empty() {
            return Err(WireError::MalformedGgep("empty LF data".into()));
        }
        let mut value: u64 = 0;
        let mut shift = 0u32;
        let last = data.len() - 1;
        for (i, &b) in data.iter().enumerate() {
            if b & 0x80 == 0 {
                return Err(WireError::MalformedGgep(
                    "LF byte missing continuation marker".into(),
                ));
            }
            let low7 = (b & 0x7f) as u64;
            if i == last && low7 == 0 && data.len() > 1 {
                return Err(WireError::MalformedGgep("LF trailing zero group".into()));
            }
            value |= low7 << shift;
            shift += 7;
        }
        Ok(value)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn roundtrip_small() {
            for v in [0u64, 1, 42, 127, 128, 300] {
                let enc = encode(v);
                assert!(enc.iter().all(|b| b & 0x80 != 0));
                assert_eq!(decode(&enc).unwrap(), v);
            }
        }

        #[test]
        fn roundtrip_large() {
            let v = 4_294_967_296u64; // > u32::MAX, a real large-file length
            let enc = encode(v);
            assert_eq!(decode(&enc).unwrap(), v);
        }

        #[test]
        fn zero_is_single_byte() {
            let enc = encode(0);
            assert_eq!(enc, vec![0x80]);
            assert_eq!(decode(&enc).unwrap(), 0);
        }

        #[test]
        fn decode_rejects_missing_marker() {
            assert!(decode(&[0x01]).is_err());
        }

        #[test]
        fn decode_rejects_noncanonical_trailing_zero() {
            // two bytes where the final group is all-zero: not canonical
            assert!(decode(&[0x81, 0x80]).is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_extension_roundtrip() {
        let exts = vec![Extension::new("H", vec![1, 2, 3, 4])];
        let block = write_block(&exts, &[]).unwrap();
        assert_eq!(block[0], GGEP_MAGIC);
        let parsed = parse_block(&block).unwrap();
        assert_eq!(parsed, exts);
    }

    #[test]
    fn multiple_extensions_roundtrip() {
        let exts = vec![
            Extension::new("ALT", vec![10, 20, 30]),
            Extension::new("LF", lf::encode(123_456)),
        ];
        let block = write_block(&exts, &[]).unwrap();
        let parsed = parse_block(&block).unwrap();
        assert_eq!(parsed, exts);
    }

    #[test]
    fn cobs_encoded_extension_roundtrip() {
        let exts = vec![Extension::new("H", vec![0, 1, 0, 2, 0])];
        let block = write_block(&exts, &["H"]).unwrap();
        let parsed = parse_block(&block).unwrap();
        assert_eq!(parsed, exts);
    }

    #[test]
    fn missing_magic_rejected() {
        assert!(parse_block(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn empty_block_rejected() {
        assert!(parse_block(&[]).is_err());
    }

    #[test]
    fn zero_length_id_rejected() {
        // flags byte with id_len bits == 0, then immediately "last"
        let buf = vec![GGEP_MAGIC, FLAG_LAST];
        assert!(parse_block(&buf).is_err());
    }

    #[test]
    fn write_rejects_oversized_id() {
        let exts = vec![Extension::new("TOOLONGID", vec![1])];
        assert!(write_block(&exts, &[]).is_err());
    }
}
