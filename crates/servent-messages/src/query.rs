use servent_wire::ggep::Extension;

use crate::{parse_trailing_ggep, MessageError, Result};

/// The connection-speed field doubles as a flags field in modern
/// Gnutella: bit 15 gates whether bits 11-14 carry any meaning at all.
/// Older clients leave `min_speed` as a plain KB/s value with bit 15
/// unset, so the flag bits below must never be read without it.
pub const SPEED_FLAG_VALID: u16 = 0x8000;
/// Peer is firewalled (bit 14).
pub const SPEED_FLAG_FIREWALLED: u16 = 0x4000;
/// Peer opts out of XML metadata in hits (bit 13).
pub const SPEED_FLAG_XML: u16 = 0x2000;
/// Peer wants an out-of-band (UDP) reply rather than one routed back
/// through the mesh (bit 12).
pub const SPEED_FLAG_OUT_OF_BAND: u16 = 0x1000;
/// Peer understands GGEP "H" compact hash extensions (bit 11).
pub const SPEED_FLAG_GGEP_H: u16 = 0x0800;

/// A Query payload: a minimum-speed/flags field, a NUL-terminated search
/// string, and an optional trailing GGEP block (e.g. a `"URN"` selector or
/// out-of-band reply address).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub min_speed: u16,
    pub search: String,
    pub ggep: Option<Vec<Extension>>,
}

impl Query {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 2 {
            return Err(MessageError::LengthMismatch {
                expected: 2,
                got: body.len(),
            });
        }
        let min_speed = u16::from_le_bytes([body[0], body[1]]);
        let rest = &body[2..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(MessageError::UnterminatedText)?;
        let search =
            String::from_utf8(rest[..nul].to_vec()).map_err(|_| MessageError::InvalidUtf8)?;
        let tail = &rest[nul + 1..];
        let ggep = parse_trailing_ggep(tail);
        Ok(Self {
            min_speed,
            search,
            ggep,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(2 + self.search.len() + 1);
        out.extend_from_slice(&self.min_speed.to_le_bytes());
        out.extend_from_slice(self.search.as_bytes());
        out.push(0);
        if let Some(exts) = &self.ggep {
            out.extend_from_slice(&servent_wire::ggep::write_block(exts, &[])?);
        }
        Ok(out)
    }

    fn flag(&self, bit: u16) -> bool {
        self.min_speed & SPEED_FLAG_VALID != 0 && self.min_speed & bit != 0
    }

    pub fn wants_out_of_band(&self) -> bool {
        self.flag(SPEED_FLAG_OUT_OF_BAND)
    }

    pub fn is_firewalled(&self) -> bool {
        self.flag(SPEED_FLAG_FIREWALLED)
    }

    pub fn wants_xml_opt_out(&self) -> bool {
        self.flag(SPEED_FLAG_XML)
    }

    pub fn understands_ggep_h(&self) -> bool {
        self.flag(SPEED_FLAG_GGEP_H)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_plain_query() {
        let q = Query {
            min_speed: 0,
            search: "gnutella spec".into(),
            ggep: None,
        };
        let encoded = q.encode().unwrap();
        assert_eq!(Query::decode(&encoded).unwrap(), q);
    }

    #[test]
    fn roundtrip_with_ggep() {
        let q = Query {
            min_speed: SPEED_FLAG_VALID | SPEED_FLAG_OUT_OF_BAND,
            search: "urn lookup".into(),
            ggep: Some(vec![Extension::new("URN", b"sha1:ABC".to_vec())]),
        };
        let encoded = q.encode().unwrap();
        let decoded = Query::decode(&encoded).unwrap();
        assert_eq!(decoded, q);
        assert!(decoded.wants_out_of_band());
    }

    #[test]
    fn flag_bits_are_ignored_unless_bit_15_marks_them_valid() {
        let q = Query {
            min_speed: SPEED_FLAG_OUT_OF_BAND | SPEED_FLAG_FIREWALLED,
            search: "no flags bit".into(),
            ggep: None,
        };
        assert!(!q.wants_out_of_band());
        assert!(!q.is_firewalled());
    }

    #[test]
    fn flag_bits_apply_once_valid_bit_is_set() {
        let q = Query {
            min_speed: SPEED_FLAG_VALID | SPEED_FLAG_FIREWALLED | SPEED_FLAG_GGEP_H,
            search: "flags bit set".into(),
            ggep: None,
        };
        assert!(q.is_firewalled());
        assert!(q.understands_ggep_h());
        assert!(!q.wants_out_of_band());
        assert!(!q.wants_xml_opt_out());
    }

    #[test]
    fn missing_terminator_rejected() {
        let body = [0u8, 0u8, b'n', b'o', b'n', b'u', b'l'];
        assert!(matches!(
            Query::decode(&body),
            Err(MessageError::UnterminatedText)
        ));
    }
}
