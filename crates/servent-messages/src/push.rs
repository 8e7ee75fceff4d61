use crate::{MessageError, Result};

const FIXED_LEN: usize = 26;

/// A Push request: ask `servent_id` to open an outbound connection to us
/// for the file at `file_index`, since we couldn't reach it directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Push {
    pub servent_id: [u8; 16],
    pub file_index: u32,
    pub ip: [u8; 4],
    pub port: u16,
}

impl Push {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < FIXED_LEN {
            return Err(MessageError::LengthMismatch {
                expected: FIXED_LEN,
                got: body.len(),
            });
        }
        let mut servent_id = [0u8; 16];
        servent_id.copy_from_slice(&body[0..16]);
        let file_index = u32::from_le_bytes([body[16], body[17], body[18], body[19]]);
        let ip = [body[20], body[21], body[22], body[23]];
        let port = u16::from_le_bytes([body[24], body[25]]);
        Ok(Self {
            servent_id,
            file_index,
            ip,
            port,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_LEN);
        out.extend_from_slice(&self.servent_id);
        out.extend_from_slice(&self.file_index.to_le_bytes());
        out.extend_from_slice(&self.ip);
        out.extend_from_slice(&self.port.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let p = Push {
            servent_id: [3u8; 16],
            file_index: 17,
            ip: [192, 168, 0, 5],
            port: 6346,
        };
        let encoded = p.encode();
        assert_eq!(encoded.len(), FIXED_LEN);
        assert_eq!(Push::decode(&encoded).unwrap(), p);
    }

    #[test]
    fn truncated_rejected() {
        assert!(matches!(
            Push::decode(&[0u8; 10]),
            Err(MessageError::LengthMismatch { .. })
        ));
    }
}
