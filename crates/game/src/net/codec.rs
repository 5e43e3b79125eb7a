//! JSON wire codec.
//!
//! Datagrams carry exactly one encoded message. Stream transports carry
//! newline-delimited messages; [`StreamDecoder`] holds any partial line
//! between reads.

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(message).map_err(CodecError::Encode)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(data).map_err(CodecError::Decode)
}

/// Encodes `message` followed by a single `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let mut data = encode(message)?;
    data.push(b'\n');
    Ok(data)
}

/// Decodes every complete line in `buffer`.
///
/// Returns one result per complete line and the unconsumed tail, which is
/// empty when `buffer` ends with a newline. Blank lines are skipped.
pub fn split_lines<T: DeserializeOwned>(buffer: &[u8]) -> (Vec<Result<T, CodecError>>, &[u8]) {
    let mut decoded = Vec::new();
    let mut start = 0;

    while let Some(offset) = buffer[start..].iter().position(|&b| b == b'\n') {
        let line = trim_line(&buffer[start..start + offset]);
        if !line.is_empty() {
            decoded.push(decode(line));
        }
        start += offset + 1;
    }

    (decoded, &buffer[start..])
}

fn trim_line(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Reassembles newline-delimited messages across arbitrary read boundaries.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    malformed: u64,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every message completed by them.
    /// Malformed lines are dropped and counted.
    pub fn feed<T: DeserializeOwned>(&mut self, bytes: &[u8]) -> Vec<T> {
        self.pending.extend_from_slice(bytes);

        let (results, rest) = split_lines::<T>(&self.pending);
        let consumed = self.pending.len() - rest.len();

        let mut messages = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(message) => messages.push(message),
                Err(e) => {
                    self.malformed += 1;
                    log::debug!("dropping malformed line: {}", e);
                }
            }
        }

        self.pending.drain(..consumed);
        messages
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{DenyReason, Message, PROTOCOL_VERSION};

    fn sample() -> Vec<Message> {
        vec![
            Message::Hello {
                protocol: PROTOCOL_VERSION,
                name: "X".into(),
            },
            Message::JoinDeny {
                reason: DenyReason::Full,
            },
            Message::Ping { time: 12.5 },
        ]
    }

    #[test]
    fn datagram_roundtrip() {
        for message in sample() {
            let bytes = encode(&message).unwrap();
            let decoded: Message = decode(&bytes).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn malformed_datagram_is_an_error() {
        assert!(decode::<Message>(b"{not json").is_err());
        assert!(decode::<Message>(br#"{"type":"teleport"}"#).is_err());
        assert!(decode::<Message>(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn split_lines_keeps_partial_tail() {
        let mut buffer = encode_line(&sample()[0]).unwrap();
        buffer.extend_from_slice(br#"{"type":"ping","ti"#);

        let (messages, rest) = split_lines::<Message>(&buffer);
        assert_eq!(messages.len(), 1);
        assert_eq!(rest, br#"{"type":"ping","ti"#);
    }

    #[test]
    fn stream_decoder_survives_byte_by_byte_delivery() {
        let mut wire = Vec::new();
        for message in sample() {
            wire.extend(encode_line(&message).unwrap());
        }

        let mut decoder = StreamDecoder::new();
        let mut out: Vec<Message> = Vec::new();
        for byte in &wire {
            out.extend(decoder.feed::<Message>(std::slice::from_ref(byte)));
        }

        assert_eq!(out, sample());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn stream_decoder_skips_garbage_lines() {
        let mut wire = b"garbage\r\n\n".to_vec();
        wire.extend(encode_line(&Message::Pong { time: 1.0 }).unwrap());

        let mut decoder = StreamDecoder::new();
        let out: Vec<Message> = decoder.feed(&wire);

        assert_eq!(out, vec![Message::Pong { time: 1.0 }]);
        assert_eq!(decoder.malformed_count(), 1);
    }
}
