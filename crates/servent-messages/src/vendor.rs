use crate::{MessageError, Result};

const HEADER_LEN: usize = 8;

/// The generic vendor message frame: `[vendor:4][selector:2 LE][version:2
/// LE][payload]`. `servent-vendor` owns dispatching on `(vendor, selector,
/// version)`; this crate only knows how to frame and unframe it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VendorFrame {
    pub vendor: [u8; 4],
    pub selector: u16,
    pub version: u16,
    pub payload: Vec<u8>,
}

impl VendorFrame {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < HEADER_LEN {
            return Err(MessageError::LengthMismatch {
                expected: HEADER_LEN,
                got: body.len(),
            });
        }
        let mut vendor = [0u8; 4];
        vendor.copy_from_slice(&body[0..4]);
        let selector = u16::from_le_bytes([body[4], body[5]]);
        let version = u16::from_le_bytes([body[6], body[7]]);
        let payload = body[HEADER_LEN..].to_vec();
        Ok(Self {
            vendor,
            selector,
            version,
            payload,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.vendor);
        out.extend_from_slice(&self.selector.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let f = VendorFrame {
            vendor: *b"LIME",
            selector: 0x0015,
            version: 2,
            payload: vec![1, 2, 3],
        };
        let encoded = f.encode();
        assert_eq!(VendorFrame::decode(&encoded).unwrap(), f);
    }

    #[test]
    fn truncated_header_rejected() {
        assert!(matches!(
            VendorFrame::decode(&[0u8; 5]),
            Err(MessageError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn empty_payload_ok() {
        let f = VendorFrame {
            vendor: *b"BEAR",
            selector: 0x0004,
            version: 1,
            payload: vec![],
        };
        let encoded = f.encode();
        assert_eq!(encoded.len(), HEADER_LEN);
        assert_eq!(VendorFrame::decode(&encoded).unwrap(), f);
    }
}
