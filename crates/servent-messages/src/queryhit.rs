use servent_wire::ggep::Extension;

use crate::{MessageError, Result};

/// File sizes at or above this value don't fit the legacy 32-bit size
/// field: it is set to `0xFFFFFFFF` and the true size travels in a GGEP
/// "LF" extension instead.
pub const LARGE_FILE_THRESHOLD: u64 = 1 << 31;

const LEGACY_SIZE_OVERFLOW: u32 = 0xFFFFFFFF;

/// One result record within a Query Hit packet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitRecord {
    pub file_index: u32,
    pub file_size: u64,
    pub file_name: String,
    /// Per-record GGEP extensions (e.g. `"H"` SHA-1 urn, `"ALT"` alt-locs),
    /// nested between the two NUL terminators gtk-gnutella's record layout
    /// uses for this purpose.
    pub extensions: Option<Vec<Extension>>,
}

impl HitRecord {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let legacy_size = if self.file_size >= LARGE_FILE_THRESHOLD {
            LEGACY_SIZE_OVERFLOW
        } else {
            self.file_size as u32
        };
        out.extend_from_slice(&self.file_index.to_le_bytes());
        out.extend_from_slice(&legacy_size.to_le_bytes());
        out.extend_from_slice(self.file_name.as_bytes());
        out.push(0);
        if let Some(exts) = &self.extensions {
            out.extend_from_slice(&servent_wire::ggep::write_block(exts, &["H"])?);
        }
        out.push(0);
        Ok(())
    }

    fn decode_from(buf: &[u8], pos: &mut usize) -> Result<Self> {
        let need = |n: usize| -> Result<()> {
            if *pos + n > buf.len() {
                Err(MessageError::LengthMismatch {
                    expected: n,
                    got: buf.len().saturating_sub(*pos),
                })
            } else {
                Ok(())
            }
        };
        need(8)?;
        let file_index = u32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap());
        let legacy_size = u32::from_le_bytes(buf[*pos + 4..*pos + 8].try_into().unwrap());
        *pos += 8;

        let name_end = buf[*pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(MessageError::UnterminatedText)?;
        let file_name = String::from_utf8(buf[*pos..*pos + name_end].to_vec())
            .map_err(|_| MessageError::InvalidUtf8)?;
        *pos += name_end + 1;

        let ext_end = buf[*pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(MessageError::UnterminatedText)?;
        let ext_slice = &buf[*pos..*pos + ext_end];
        let extensions = if ext_slice.first() == Some(&servent_wire::ggep::GGEP_MAGIC) {
            Some(servent_wire::ggep::parse_block(ext_slice)?)
        } else {
            None
        };
        *pos += ext_end + 1;

        let file_size = if legacy_size == LEGACY_SIZE_OVERFLOW {
            extensions
                .as_ref()
                .and_then(|exts| exts.iter().find(|e| e.id == "LF"))
                .and_then(|e| servent_wire::ggep::lf::decode(&e.data).ok())
                .unwrap_or(legacy_size as u64)
        } else {
            legacy_size as u64
        };

        Ok(Self {
            file_index,
            file_size,
            file_name,
            extensions,
        })
    }
}

/// A Query Hit: the responding servent's socket info, a list of matching
/// records, and a trailer carrying vendor code, open-data flags, an
/// optional whole-packet GGEP block, and the servent id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryHit {
    pub port: u16,
    pub ip: [u8; 4],
    pub speed: u32,
    pub records: Vec<HitRecord>,
    pub vendor_code: [u8; 4],
    pub open_flags: u8,
    pub trailer_ggep: Option<Vec<Extension>>,
    pub servent_id: [u8; 16],
}

impl QueryHit {
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.records.len() > u8::MAX as usize {
            return Err(MessageError::LengthMismatch {
                expected: u8::MAX as usize,
                got: self.records.len(),
            });
        }
        let mut out = Vec::new();
        out.push(self.records.len() as u8);
        out.extend_from_slice(&self.port.to_le_bytes());
        out.extend_from_slice(&self.ip);
        out.extend_from_slice(&self.speed.to_le_bytes());
        for record in &self.records {
            record.encode_into(&mut out)?;
        }
        out.extend_from_slice(&self.vendor_code);
        out.push(1); // open data size: one flags byte
        out.push(self.open_flags);
        if let Some(exts) = &self.trailer_ggep {
            out.extend_from_slice(&servent_wire::ggep::write_block(exts, &["H"])?);
        }
        out.extend_from_slice(&self.servent_id);
        Ok(out)
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 11 + 16 {
            return Err(MessageError::LengthMismatch {
                expected: 11 + 16,
                got: body.len(),
            });
        }
        let num_hits = body[0] as usize;
        let port = u16::from_le_bytes([body[1], body[2]]);
        let ip = [body[3], body[4], body[5], body[6]];
        let speed = u32::from_le_bytes([body[7], body[8], body[9], body[10]]);

        let mut pos = 11;
        let mut records = Vec::with_capacity(num_hits);
        for _ in 0..num_hits {
            records.push(HitRecord::decode_from(body, &mut pos)?);
        }

        let servent_id_start = body.len() - 16;
        if pos + 4 + 1 > servent_id_start {
            return Err(MessageError::LengthMismatch {
                expected: pos + 4 + 1,
                got: servent_id_start,
            });
        }
        let mut vendor_code = [0u8; 4];
        vendor_code.copy_from_slice(&body[pos..pos + 4]);
        pos += 4;
        let open_size = body[pos] as usize;
        pos += 1;
        let open_flags = if open_size >= 1 { body[pos] } else { 0 };
        pos += open_size;

        let trailer_ggep = if pos < servent_id_start
            && body[pos..servent_id_start].first() == Some(&servent_wire::ggep::GGEP_MAGIC)
        {
            Some(servent_wire::ggep::parse_block(&body[pos..servent_id_start])?)
        } else {
            None
        };

        let mut servent_id = [0u8; 16];
        servent_id.copy_from_slice(&body[servent_id_start..]);

        Ok(Self {
            port,
            ip,
            speed,
            records,
            vendor_code,
            open_flags,
            trailer_ggep,
            servent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryHit {
        QueryHit {
            port: 6346,
            ip: [1, 2, 3, 4],
            speed: 100,
            records: vec![
                HitRecord {
                    file_index: 0,
                    file_size: 1024,
                    file_name: "a.txt".into(),
                    extensions: None,
                },
                HitRecord {
                    file_index: 1,
                    file_size: 2048,
                    file_name: "b.bin".into(),
                    extensions: Some(vec![Extension::new("H", vec![1, 2, 3])]),
                },
            ],
            vendor_code: *b"GTKG",
            open_flags: 0x04,
            trailer_ggep: Some(vec![Extension::new("BH", vec![1])]),
            servent_id: [9u8; 16],
        }
    }

    #[test]
    fn roundtrip_full() {
        let hit = sample();
        let encoded = hit.encode().unwrap();
        let decoded = QueryHit::decode(&encoded).unwrap();
        assert_eq!(decoded, hit);
    }

    #[test]
    fn roundtrip_no_trailer_ggep() {
        let mut hit = sample();
        hit.trailer_ggep = None;
        let encoded = hit.encode().unwrap();
        let decoded = QueryHit::decode(&encoded).unwrap();
        assert_eq!(decoded, hit);
    }

    #[test]
    fn too_many_records_rejected() {
        let mut hit = sample();
        hit.records = (0..300)
            .map(|i| HitRecord {
                file_index: i,
                file_size: 1,
                file_name: "x".into(),
                extensions: None,
            })
            .collect();
        assert!(hit.encode().is_err());
    }

    #[test]
    fn large_file_size_writes_legacy_overflow_and_lf_extension() {
        let true_size = (1u64 << 31) + 123_456_789;
        let mut hit = sample();
        hit.records = vec![HitRecord {
            file_index: 0,
            file_size: true_size,
            file_name: "big.iso".into(),
            extensions: Some(vec![Extension::new("LF", servent_wire::ggep::lf::encode(true_size))]),
        }];
        let encoded = hit.encode().unwrap();
        let decoded = QueryHit::decode(&encoded).unwrap();
        assert_eq!(decoded.records[0].file_size, true_size);
        // the legacy 32-bit field in the wire bytes is the overflow sentinel
        let legacy = u32::from_le_bytes(encoded[15..19].try_into().unwrap());
        assert_eq!(legacy, LEGACY_SIZE_OVERFLOW);
    }
}
