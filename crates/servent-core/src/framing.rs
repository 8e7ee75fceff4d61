//! Reading and writing whole Gnutella messages off an async byte stream.
//!
//! The wire format needs no outer length prefix: the 23-octet header
//! itself carries the payload length, so framing is just "read the
//! header, then read exactly that many more bytes."

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use servent_messages::Message;
use servent_wire::header::HEADER_LEN;

use crate::error::{CoreError, Result};

/// A message larger than this is rejected without being buffered, so a
/// malicious peer can't force an unbounded allocation via a bogus
/// payload-length field.
pub const MAX_PAYLOAD_LEN: u32 = 64 * 1024;

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut header_buf = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header_buf)
        .await
        .map_err(|_| CoreError::Wire(servent_wire::WireError::Truncated {
            need: HEADER_LEN,
            have: 0,
        }))?;

    let header = servent_wire::header::MessageHeader::decode(&header_buf)?;
    if header.payload_len > MAX_PAYLOAD_LEN {
        return Err(CoreError::Wire(servent_wire::WireError::OutOfRange(format!(
            "payload length {} exceeds maximum {}",
            header.payload_len, MAX_PAYLOAD_LEN
        ))));
    }

    let mut full = header_buf.to_vec();
    let mut payload = vec![0u8; header.payload_len as usize];
    reader.read_exact(&mut payload).await.map_err(|_| {
        CoreError::Wire(servent_wire::WireError::Truncated {
            need: header.payload_len as usize,
            have: 0,
        })
    })?;
    full.extend_from_slice(&payload);

    Ok(Message::decode(&full)?)
}

pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> Result<()> {
    let bytes = message.encode()?;
    writer.write_all(&bytes).await.map_err(|e| {
        CoreError::Wire(servent_wire::WireError::OutOfRange(format!("write failed: {e}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use servent_messages::{Message, Payload, Ping};
    use servent_wire::header::{Function, MessageHeader};

    #[tokio::test]
    async fn roundtrip_over_a_duplex_stream() {
        let message = Message {
            header: MessageHeader::new([1u8; 16], Function::Ping.as_u8(), 5, 0, 0),
            payload: Payload::Ping(Ping::default()),
        };
        let mut buf = Vec::new();
        write_message(&mut buf, &message).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_message(&mut cursor).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn oversized_payload_rejected() {
        let mut header = MessageHeader::new([1u8; 16], Function::Query.as_u8(), 1, 0, 0);
        header.set_payload_len(MAX_PAYLOAD_LEN + 1);
        let buf = header.encode().to_vec();
        let mut cursor = std::io::Cursor::new(buf);
        assert!(read_message(&mut cursor).await.is_err());
    }
}
