//! Typed Gnutella message payloads built on top of [`servent_wire`].
//!
//! Each payload type owns its own `encode`/`decode` pair; [`Message`] pairs
//! a decoded payload with the [`MessageHeader`] it arrived under, the way
//! the router and query pipeline want to consume it. Unknown or
//! not-yet-implemented function codes decode to [`Payload::Unknown`]
//! instead of failing, since the router needs to forward messages it does
//! not itself understand.

use servent_wire::ggep::{self, Extension};
use servent_wire::header::{Function, MessageHeader, Muid};
use servent_wire::{WireError};

pub mod ping;
pub mod pong;
pub mod push;
pub mod query;
pub mod queryhit;
pub mod vendor;

pub use ping::Ping;
pub use pong::Pong;
pub use push::Push;
pub use query::Query;
pub use queryhit::QueryHit;
pub use vendor::VendorFrame;

/// Error type for message-level (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("payload does not match declared length: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("search text is not NUL-terminated")]
    UnterminatedText,

    #[error("search text is not valid UTF-8")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// A decoded Gnutella message body. Every variant other than `Unknown`
/// corresponds to one of the function codes in
/// [`servent_wire::header::Function`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Ping(Ping),
    Pong(Pong),
    Bye { code: u16, message: String },
    Query(Query),
    QueryHit(QueryHit),
    Push(Push),
    Vendor(VendorFrame),
    /// A function code the core doesn't interpret; carried opaquely so it
    /// can still be routed, counted, and dropped on TTL expiry.
    Unknown { function: u8, raw: Vec<u8> },
}

/// A full message: header plus decoded payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Payload,
}

impl Message {
    pub fn muid(&self) -> Muid {
        self.header.muid
    }

    /// Decode a full message from `[header | payload]` bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = MessageHeader::decode(buf)?;
        let start = servent_wire::header::HEADER_LEN;
        let end = start + header.payload_len as usize;
        let body = buf.get(start..end).ok_or(MessageError::LengthMismatch {
            expected: header.payload_len as usize,
            got: buf.len().saturating_sub(start),
        })?;

        let payload = match Function::from_u8(header.function) {
            Some(Function::Ping) => Payload::Ping(Ping::decode(body)?),
            Some(Function::Pong) => Payload::Pong(Pong::decode(body)?),
            Some(Function::Bye) => decode_bye(body)?,
            Some(Function::Query) => Payload::Query(Query::decode(body)?),
            Some(Function::QueryHit) => Payload::QueryHit(QueryHit::decode(body)?),
            Some(Function::Push) => Payload::Push(Push::decode(body)?),
            Some(Function::Vendor) | Some(Function::VendorStd) => {
                Payload::Vendor(VendorFrame::decode(body)?)
            }
            Some(Function::Qrp) | None => Payload::Unknown {
                function: header.function,
                raw: body.to_vec(),
            },
        };

        Ok(Self { header, payload })
    }

    /// Encode the full message, fixing up the header's payload length.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = match &self.payload {
            Payload::Ping(p) => p.encode(),
            Payload::Pong(p) => p.encode(),
            Payload::Bye { code, message } => encode_bye(*code, message),
            Payload::Query(q) => q.encode()?,
            Payload::QueryHit(h) => h.encode()?,
            Payload::Push(p) => p.encode(),
            Payload::Vendor(v) => v.encode(),
            Payload::Unknown { raw, .. } => raw.clone(),
        };
        let mut header = self.header;
        header.set_payload_len(body.len() as u32);
        let mut out = header.encode().to_vec();
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn decode_bye(body: &[u8]) -> Result<Payload> {
    if body.len() < 3 {
        return Ok(Payload::Bye {
            code: 0,
            message: String::new(),
        });
    }
    let code = u16::from_le_bytes([body[0], body[1]]);
    let len = body[2] as usize;
    let text = body
        .get(3..3 + len)
        .ok_or(MessageError::LengthMismatch {
            expected: len,
            got: body.len().saturating_sub(3),
        })?;
    let message = String::from_utf8(text.to_vec()).map_err(|_| MessageError::InvalidUtf8)?;
    Ok(Payload::Bye { code, message })
}

fn encode_bye(code: u16, message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + message.len());
    out.extend_from_slice(&code.to_le_bytes());
    let len = message.len().min(u8::MAX as usize);
    out.push(len as u8);
    out.extend_from_slice(&message.as_bytes()[..len]);
    out
}

/// Parse a trailing GGEP block out of a payload tail, if one is present.
///
/// Several payload kinds (Ping, Pong, Query, the Query Hit trailer) may
/// carry an optional GGEP block after their fixed fields; this helper is
/// shared so each payload's decoder doesn't re-derive the "is there a
/// block here" check.
pub(crate) fn parse_trailing_ggep(tail: &[u8]) -> Option<Vec<Extension>> {
    if tail.first() == Some(&ggep::GGEP_MAGIC) {
        ggep::parse_block(tail).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_muid() -> Muid {
        [7u8; 16]
    }

    #[test]
    fn message_roundtrip_ping() {
        let header = MessageHeader::new(sample_muid(), Function::Ping.as_u8(), 7, 0, 0);
        let msg = Message {
            header,
            payload: Payload::Ping(Ping::default()),
        };
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn message_roundtrip_bye() {
        let header = MessageHeader::new(sample_muid(), Function::Bye.as_u8(), 1, 0, 0);
        let msg = Message {
            header,
            payload: Payload::Bye {
                code: 200,
                message: "shutting down".into(),
            },
        };
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn unknown_function_carried_opaquely() {
        let header = MessageHeader::new(sample_muid(), Function::Qrp.as_u8(), 1, 0, 3);
        let mut buf = header.encode().to_vec();
        buf.extend_from_slice(&[9, 9, 9]);
        let decoded = Message::decode(&buf).unwrap();
        assert_eq!(
            decoded.payload,
            Payload::Unknown {
                function: Function::Qrp.as_u8(),
                raw: vec![9, 9, 9]
            }
        );
    }

    #[test]
    fn truncated_payload_rejected() {
        let header = MessageHeader::new(sample_muid(), Function::Ping.as_u8(), 1, 0, 100);
        let buf = header.encode().to_vec();
        assert!(matches!(
            Message::decode(&buf),
            Err(MessageError::LengthMismatch { .. })
        ));
    }
}
