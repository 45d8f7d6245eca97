//! Length-prefixed message framing codec.
//!
//! Frames are laid out as:
//! - 4 bytes: network magic
//! - 4 bytes: big-endian body length
//! - N bytes: bincode-serialized [`Message`]

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{MAX_MESSAGE_SIZE, NETWORK_MAGIC};
use crate::error::{P2pError, P2pResult};
use crate::protocol::Message;
use crate::serialization;

/// Header size: 4 bytes magic + 4 bytes length.
const HEADER_SIZE: usize = 8;

/// Fail with [`P2pError::MessageTooLarge`] if `message` cannot fit in one frame.
pub fn check_frame_size(message: &Message) -> P2pResult<()> {
    let size = serialization::serialized_size(message)?;
    if size > MAX_MESSAGE_SIZE {
        return Err(P2pError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Codec for length-prefixed message framing.
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Body length of the frame being read, once its header is parsed.
    current_length: Option<usize>,
}

impl MessageCodec {
    /// Create a new message codec.
    pub fn new() -> Self {
        Self {
            current_length: None,
        }
    }

    fn read_header(src: &BytesMut) -> P2pResult<usize> {
        let magic = [src[0], src[1], src[2], src[3]];
        if magic != NETWORK_MAGIC {
            return Err(P2pError::InvalidMagic {
                expected: NETWORK_MAGIC,
                actual: magic,
            });
        }

        let length = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if length > MAX_MESSAGE_SIZE {
            return Err(P2pError::MessageTooLarge {
                size: length,
                max: MAX_MESSAGE_SIZE,
            });
        }

        Ok(length)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = P2pError;

    fn decode(&mut self, src: &mut BytesMut) -> P2pResult<Option<Self::Item>> {
        let length = match self.current_length {
            Some(length) => length,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let length = Self::read_header(src)?;
                self.current_length = Some(length);
                length
            }
        };

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(length);
        self.current_length = None;

        let message: Message = serialization::deserialize(&body)?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = P2pError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> P2pResult<()> {
        let body = serialization::serialize(&message)?;
        let length = body.len();

        if length > MAX_MESSAGE_SIZE {
            return Err(P2pError::MessageTooLarge {
                size: length,
                max: MAX_MESSAGE_SIZE,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&NETWORK_MAGIC);
        dst.put_u32(length as u32);
        dst.put_slice(&body);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StatusMessage;
    use num_bigint::BigUint;

    #[test]
    fn test_status_survives_framing() {
        let mut codec = MessageCodec::new();
        let original = Message::Status(StatusMessage {
            protocol_version: 2,
            network_id: 1,
            genesis_hash: [7u8; 32],
            head_hash: [9u8; 32],
            total_difficulty: BigUint::parse_bytes(b"123456789012345678901234567890", 10)
                .unwrap(),
        });

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_header() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&NETWORK_MAGIC);

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_body_then_rest() {
        let mut codec = MessageCodec::new();
        let mut full = BytesMut::new();
        codec.encode(Message::Ping(99), &mut full).unwrap();

        let mut buf = BytesMut::new();
        buf.put_slice(&full[..HEADER_SIZE + 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.put_slice(&full[HEADER_SIZE + 1..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Ping(99)));
    }

    #[test]
    fn test_invalid_magic() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        buf.put_u32(10);
        buf.put_slice(&[0u8; 10]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(P2pError::InvalidMagic { .. })));
    }

    #[test]
    fn test_message_too_large() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&NETWORK_MAGIC);
        buf.put_u32((MAX_MESSAGE_SIZE + 1) as u32);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(P2pError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_oversized_encode_leaves_buffer_untouched() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let message = Message::NewTransaction(crate::protocol::NewTransactionMessage {
            hash: [1u8; 32],
            payload: vec![0u8; MAX_MESSAGE_SIZE],
        });

        assert!(matches!(
            check_frame_size(&message),
            Err(P2pError::MessageTooLarge { .. })
        ));
        assert!(matches!(
            codec.encode(message, &mut buf),
            Err(P2pError::MessageTooLarge { .. })
        ));
        assert!(buf.is_empty());

        assert!(check_frame_size(&Message::Ping(1)).is_ok());
    }

    #[test]
    fn test_multiple_messages() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(Message::Ping(1), &mut buf).unwrap();
        codec.encode(Message::Disconnect(100), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Ping(1)));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Disconnect(100)));
        assert!(buf.is_empty());
    }
}
