//! The fixed 23-octet Gnutella message header.
//!
//! ```text
//! [ muid:16 | function:1 | ttl:1 | hops:1 | payload_len:4 (LE) ]
//! ```

use crate::{Result, WireError};

/// Size of the on-wire header in bytes.
pub const HEADER_LEN: usize = 23;

/// A 16-octet Message Unique IDentifier.
pub type Muid = [u8; 16];

/// Message function codes used by the core (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Function {
    Ping = 0x00,
    Pong = 0x01,
    Bye = 0x02,
    Qrp = 0x30,
    Vendor = 0x31,
    VendorStd = 0x32,
    Push = 0x40,
    Query = 0x80,
    QueryHit = 0x81,
}

impl Function {
    /// Decode a raw function byte, if it names one of the functions the
    /// core understands.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Ping),
            0x01 => Some(Self::Pong),
            0x02 => Some(Self::Bye),
            0x30 => Some(Self::Qrp),
            0x31 => Some(Self::Vendor),
            0x32 => Some(Self::VendorStd),
            0x40 => Some(Self::Push),
            0x80 => Some(Self::Query),
            0x81 => Some(Self::QueryHit),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// `function & 0x01 == 0`: a request that expects a matching reply.
    ///
    /// Queries are the one exception carried as bit pattern `0x80`, which
    /// is even, so the bit test alone is sufficient (`0x80 & 1 == 0`).
    pub fn is_request(raw: u8) -> bool {
        raw & 0x01 == 0
    }

    /// `function & 0x01 == 1`: a reply to an earlier request.
    pub fn is_reply(raw: u8) -> bool {
        raw & 0x01 == 1
    }
}

/// The 23-byte Gnutella message header, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub muid: Muid,
    /// Raw function byte. Kept raw (not [`Function`]) so unknown functions
    /// can still be routed as opaque bytes without failing to parse.
    pub function: u8,
    pub ttl: u8,
    pub hops: u8,
    pub payload_len: u32,
}

impl MessageHeader {
    /// Construct a header for a message we originate.
    pub fn new(muid: Muid, function: u8, ttl: u8, hops: u8, payload_len: u32) -> Self {
        Self {
            muid,
            function,
            ttl,
            hops,
            payload_len,
        }
    }

    /// Parse a header from the first [`HEADER_LEN`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated {
                need: HEADER_LEN,
                have: buf.len(),
            });
        }
        let mut muid = [0u8; 16];
        muid.copy_from_slice(&buf[0..16]);
        let function = buf[16];
        let ttl = buf[17];
        let hops = buf[18];
        let payload_len = u32::from_le_bytes([buf[19], buf[20], buf[21], buf[22]]);
        Ok(Self {
            muid,
            function,
            ttl,
            hops,
            payload_len,
        })
    }

    /// Encode this header into exactly [`HEADER_LEN`] bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..16].copy_from_slice(&self.muid);
        out[16] = self.function;
        out[17] = self.ttl;
        out[18] = self.hops;
        out[19..23].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    /// Whether this header names a request (`function & 0x01 == 0`).
    pub fn is_request(&self) -> bool {
        Function::is_request(self.function)
    }

    /// Whether this header names a reply (`function & 0x01 == 1`).
    pub fn is_reply(&self) -> bool {
        Function::is_reply(self.function)
    }

    /// Rewrite the payload length field after an in-place shrink
    /// (used by query compaction, spec.md §4.3.1: "never grow").
    pub fn set_payload_len(&mut self, len: u32) {
        self.payload_len = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_muid() -> Muid {
        let mut m = [0u8; 16];
        for (i, b) in m.iter_mut().enumerate() {
            *b = i as u8;
        }
        m
    }

    #[test]
    fn roundtrip() {
        let h = MessageHeader::new(sample_muid(), Function::Query.as_u8(), 7, 0, 42);
        let encoded = h.encode();
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = MessageHeader::decode(&encoded).expect("decode");
        assert_eq!(decoded, h);
    }

    #[test]
    fn truncated_buffer_rejected() {
        let buf = [0u8; HEADER_LEN - 1];
        assert!(matches!(
            MessageHeader::decode(&buf),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn request_reply_bit() {
        assert!(Function::is_request(Function::Ping.as_u8()));
        assert!(Function::is_reply(Function::Pong.as_u8()));
        assert!(Function::is_request(Function::Query.as_u8()));
        assert!(Function::is_reply(Function::QueryHit.as_u8()));
        assert!(Function::is_request(Function::Push.as_u8()));
    }

    #[test]
    fn function_from_u8_rejects_unknown() {
        assert_eq!(Function::from_u8(0x99), None);
        assert_eq!(Function::from_u8(0x80), Some(Function::Query));
    }

    #[test]
    fn payload_len_is_little_endian() {
        let h = MessageHeader::new(sample_muid(), 0x80, 1, 0, 0x0102_0304);
        let encoded = h.encode();
        assert_eq!(&encoded[19..23], &[0x04, 0x03, 0x02, 0x01]);
    }
}
