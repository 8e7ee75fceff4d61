use servent_wire::ggep::Extension;

use crate::{parse_trailing_ggep, MessageError, Result};

/// Fixed-width portion of a Pong: listening port, address, and the
/// advertised file/KB counts the pong cache uses for hop-bucket and
/// ultrapeer classification.
const FIXED_LEN: usize = 14;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pong {
    pub port: u16,
    pub ip: [u8; 4],
    pub files_shared: u32,
    pub kb_shared: u32,
    pub ggep: Option<Vec<Extension>>,
}

impl Pong {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < FIXED_LEN {
            return Err(MessageError::LengthMismatch {
                expected: FIXED_LEN,
                got: body.len(),
            });
        }
        let port = u16::from_le_bytes([body[0], body[1]]);
        let ip = [body[2], body[3], body[4], body[5]];
        let files_shared = u32::from_le_bytes([body[6], body[7], body[8], body[9]]);
        let kb_shared = u32::from_le_bytes([body[10], body[11], body[12], body[13]]);
        let ggep = parse_trailing_ggep(&body[FIXED_LEN..]);
        Ok(Self {
            port,
            ip,
            files_shared,
            kb_shared,
            ggep,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_LEN);
        out.extend_from_slice(&self.port.to_le_bytes());
        out.extend_from_slice(&self.ip);
        out.extend_from_slice(&self.files_shared.to_le_bytes());
        out.extend_from_slice(&self.kb_shared.to_le_bytes());
        if let Some(exts) = &self.ggep {
            if let Ok(block) = servent_wire::ggep::write_block(exts, &[]) {
                out.extend_from_slice(&block);
            }
        }
        out
    }

    /// A pong advertises ultrapeer capacity once it claims at least 8 KB
    /// shared and that count is a power of two (gtk-gnutella's own
    /// heuristic for "this host rounded its share size").
    pub fn is_ultrapeer(&self) -> bool {
        self.kb_shared >= 8 && self.kb_shared.is_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_without_ggep() {
        let p = Pong {
            port: 6346,
            ip: [127, 0, 0, 1],
            files_shared: 100,
            kb_shared: 4096,
            ggep: None,
        };
        let encoded = p.encode();
        assert_eq!(encoded.len(), FIXED_LEN);
        assert_eq!(Pong::decode(&encoded).unwrap(), p);
    }

    #[test]
    fn roundtrip_with_ggep() {
        let p = Pong {
            port: 6346,
            ip: [10, 0, 0, 1],
            files_shared: 1,
            kb_shared: 16,
            ggep: Some(vec![Extension::new("UP", vec![1, 0, 0])]),
        };
        let encoded = p.encode();
        assert_eq!(Pong::decode(&encoded).unwrap(), p);
    }

    #[test]
    fn truncated_pong_rejected() {
        assert!(matches!(
            Pong::decode(&[0u8; 3]),
            Err(MessageError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn ultrapeer_classification() {
        assert!(Pong {
            kb_shared: 8,
            ..Default::default()
        }
        .is_ultrapeer());
        assert!(Pong {
            kb_shared: 1024,
            ..Default::default()
        }
        .is_ultrapeer());
        assert!(!Pong {
            kb_shared: 7,
            ..Default::default()
        }
        .is_ultrapeer());
        assert!(!Pong {
            kb_shared: 12,
            ..Default::default()
        }
        .is_ultrapeer());
    }
}
