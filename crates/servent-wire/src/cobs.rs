//! Consistent Overhead Byte Stuffing.
//!
//! Used by GGEP to keep an extension's data segment free of the NUL byte,
//! which would otherwise be ambiguous with a C-style string terminator in
//! some legacy decoders. Overhead is at most one byte per 254 input bytes.

use crate::{Result, WireError};

/// Encode `data` into a COBS frame. The output never contains a zero byte.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 254 + 1);
    let mut code_idx = 0;
    out.push(0); // placeholder for the first code byte
    let mut code = 1u8;

    for &b in data {
        if b == 0 {
            out[code_idx] = code;
            code_idx = out.len();
            out.push(0); // placeholder
            code = 1;
        } else {
            out.push(b);
            code += 1;
            if code == 0xFF {
                out[code_idx] = code;
                code_idx = out.len();
                out.push(0);
                code = 1;
            }
        }
    }
    out[code_idx] = code;
    out
}

/// Decode a COBS frame produced by [`encode`].
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(frame.len());
    let mut i = 0;
    while i < frame.len() {
        let code = frame[i] as usize;
        if code == 0 {
            return Err(WireError::MalformedCobs);
        }
        i += 1;
        let end = i + (code - 1);
        if end > frame.len() {
            return Err(WireError::MalformedCobs);
        }
        out.extend_from_slice(&frame[i..end]);
        i = end;
        if code != 0xFF && i < frame.len() {
            out.push(0);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let encoded = encode(data);
        assert!(!encoded.contains(&0), "encoded frame must have no zero bytes");
        let decoded = decode(&encoded).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn empty() {
        roundtrip(&[]);
    }

    #[test]
    fn no_zeros() {
        roundtrip(b"hello world");
    }

    #[test]
    fn with_embedded_zeros() {
        roundtrip(&[1, 0, 2, 0, 0, 3]);
    }

    #[test]
    fn long_run_without_zero() {
        let data = vec![1u8; 400];
        roundtrip(&data);
    }

    #[test]
    fn leading_and_trailing_zero() {
        roundtrip(&[0, 1, 2, 3, 0]);
    }

    #[test]
    fn decode_rejects_zero_code_byte() {
        assert!(matches!(decode(&[0, 1, 2]), Err(WireError::MalformedCobs)));
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        assert!(matches!(decode(&[5, 1, 2]), Err(WireError::MalformedCobs)));
    }
}
