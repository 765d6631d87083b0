use bytes::{BufMut, Bytes, BytesMut};

use crate::envelope::DELIMITER;
use crate::error::{FrameError, Result};
use crate::sync::MARKER;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default maximum tag length in bytes.
pub const DEFAULT_MAX_TAG_LEN: usize = 256;

/// Default ceiling for a single payload read. The robot's UART bridge drops
/// data when asked for much more than this at once.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Width the firmware pads the length field to (`%5d`).
const LENGTH_FIELD_WIDTH: usize = 5;

/// One complete frame as read off the wire, before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Envelope tag.
    pub tag: String,
    /// Declared payload length from the envelope.
    pub length: usize,
    /// The payload bytes.
    pub payload: Bytes,
}

impl RawFrame {
    /// Create a frame whose declared length matches its payload.
    pub fn new(tag: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            tag: tag.into(),
            length: payload.len(),
            payload,
        }
    }

    /// Whether the payload holds exactly the declared number of bytes.
    pub fn is_complete(&self) -> bool {
        self.payload.len() == self.length
    }

    /// The total wire size of this frame as the firmware encodes it.
    pub fn wire_size(&self) -> usize {
        MARKER.len()
            + self.length.to_string().len().max(LENGTH_FIELD_WIDTH)
            + 2
            + self.tag.len()
            + 2
            + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────┬──────────────────┬────┬──────────┬────┬──────────────────┐
/// │ "START" │ length, %5d      │ || │ tag      │ || │ payload          │
/// │ 5 bytes │ ASCII decimal    │    │ text     │    │ (length bytes)   │
/// └─────────┴──────────────────┴────┴──────────┴────┴──────────────────┘
/// ```
pub fn encode_frame(tag: &str, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if tag.as_bytes().contains(&DELIMITER) {
        return Err(FrameError::InvalidTag(tag.to_string()));
    }

    let length = format!("{:>width$}", payload.len(), width = LENGTH_FIELD_WIDTH);
    dst.reserve(MARKER.len() + length.len() + tag.len() + 4 + payload.len());
    dst.put_slice(MARKER);
    dst.put_slice(length.as_bytes());
    dst.put_slice(&[DELIMITER, DELIMITER]);
    dst.put_slice(tag.as_bytes());
    dst.put_slice(&[DELIMITER, DELIMITER]);
    dst.put_slice(payload);
    Ok(())
}

/// Configuration for frame decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Maximum tag length in bytes. Default: 256.
    pub max_tag_len: usize,
    /// Largest single read issued while collecting a payload. Default: 4000.
    pub payload_chunk_size: usize,
    /// Consecutive empty reads tolerated mid-payload before the frame is
    /// abandoned. `None` keeps waiting for the sender indefinitely.
    pub max_payload_stalls: Option<usize>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_tag_len: DEFAULT_MAX_TAG_LEN,
            payload_chunk_size: DEFAULT_CHUNK_SIZE,
            max_payload_stalls: None,
        }
    }
}

#[cfg(feature = "async")]
pub use self::async_codec::{framed, SerialCodec};

#[cfg(feature = "async")]
mod async_codec {
    use bytes::{Buf, BytesMut};
    use tokio_util::codec::{Decoder, FramedRead};
    use tracing::{debug, warn};

    use super::{FrameConfig, RawFrame};
    use crate::envelope::{Envelope, EnvelopeParser};
    use crate::error::FrameError;
    use crate::sync::Synchronizer;

    #[derive(Debug)]
    enum CodecState {
        Scanning,
        Envelope,
        Payload(Envelope),
    }

    /// `tokio_util` codec over the same marker and envelope state machines as
    /// [`FrameReader`](crate::FrameReader).
    ///
    /// Malformed envelopes never end the stream: they are logged and the codec
    /// goes back to scanning for the next marker.
    #[derive(Debug)]
    pub struct SerialCodec {
        sync: Synchronizer,
        envelope: EnvelopeParser,
        state: CodecState,
    }

    impl SerialCodec {
        pub fn new() -> Self {
            Self::with_config(&FrameConfig::default())
        }

        pub fn with_config(config: &FrameConfig) -> Self {
            Self {
                sync: Synchronizer::new(),
                envelope: EnvelopeParser::new(config.max_payload_size, config.max_tag_len),
                state: CodecState::Scanning,
            }
        }
    }

    impl Default for SerialCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Decoder for SerialCodec {
        type Item = RawFrame;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            loop {
                match std::mem::replace(&mut self.state, CodecState::Scanning) {
                    CodecState::Scanning => {
                        let found = src.iter().position(|&b| self.sync.feed(b));
                        match found {
                            Some(end) => {
                                src.advance(end + 1);
                                self.state = CodecState::Envelope;
                            }
                            None => {
                                src.clear();
                                return Ok(None);
                            }
                        }
                    }
                    CodecState::Envelope => {
                        if src.is_empty() {
                            self.state = CodecState::Envelope;
                            return Ok(None);
                        }
                        match self.envelope.feed(src.get_u8()) {
                            Ok(Some(envelope)) => self.state = CodecState::Payload(envelope),
                            Ok(None) => self.state = CodecState::Envelope,
                            Err(err) => warn!(%err, "dropping malformed envelope"),
                        }
                    }
                    CodecState::Payload(envelope) => {
                        if src.len() < envelope.length {
                            src.reserve(envelope.length - src.len());
                            self.state = CodecState::Payload(envelope);
                            return Ok(None);
                        }
                        let payload = src.split_to(envelope.length).freeze();
                        debug!(tag = %envelope.tag, length = envelope.length, "frame decoded");
                        return Ok(Some(RawFrame {
                            tag: envelope.tag,
                            length: envelope.length,
                            payload,
                        }));
                    }
                }
            }
        }

        fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            match self.decode(buf)? {
                Some(frame) => Ok(Some(frame)),
                None => {
                    // A frame cut off by end of stream is discarded.
                    buf.clear();
                    self.sync.reset();
                    self.envelope.reset();
                    self.state = CodecState::Scanning;
                    Ok(None)
                }
            }
        }
    }

    /// Wrap an async reader into a stream of raw frames.
    pub fn framed<R: tokio::io::AsyncRead>(reader: R) -> FramedRead<R, SerialCodec> {
        FramedRead::new(reader, SerialCodec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_firmware_layout() {
        let mut buf = BytesMut::new();
        encode_frame("Message", b"hi\n", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"START    3||Message||hi\n");
    }

    #[test]
    fn wide_length_is_not_truncated() {
        let payload = vec![0u8; 123_456];
        let mut buf = BytesMut::new();
        encode_frame("Image:0:0:0", &payload, &mut buf).unwrap();
        assert!(buf.starts_with(b"START123456||Image:0:0:0||"));
        assert_eq!(buf.len(), RawFrame::new("Image:0:0:0", payload).wire_size());
    }

    #[test]
    fn tag_with_delimiter_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_frame("Mess|age", b"", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::InvalidTag(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn wire_size_matches_encoding() {
        let frame = RawFrame::new("Message", Bytes::from_static(b"Walls:1:2:\n"));
        let mut buf = BytesMut::new();
        encode_frame(&frame.tag, &frame.payload, &mut buf).unwrap();
        assert_eq!(frame.wire_size(), buf.len());
        assert!(frame.is_complete());
    }

    #[test]
    fn incomplete_frame_detected() {
        let frame = RawFrame {
            tag: "Image:1:2:0".into(),
            length: 10,
            payload: Bytes::from_static(b"short"),
        };
        assert!(!frame.is_complete());
    }

    #[cfg(feature = "async")]
    mod codec_tests {
        use futures_util::StreamExt;
        use tokio_util::codec::Decoder;

        use super::*;

        fn wire(frames: &[(&str, &[u8])]) -> BytesMut {
            let mut buf = BytesMut::new();
            for (tag, payload) in frames {
                encode_frame(tag, payload, &mut buf).unwrap();
            }
            buf
        }

        #[test]
        fn decodes_across_partial_buffers() {
            let full = wire(&[("Message", &b"Walls:5:6:\n"[..])]);
            let mut codec = SerialCodec::new();
            let mut buf = BytesMut::new();

            let mut frames = Vec::new();
            for &b in full.iter() {
                buf.extend_from_slice(&[b]);
                if let Some(frame) = codec.decode(&mut buf).unwrap() {
                    frames.push(frame);
                }
            }

            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].tag, "Message");
            assert_eq!(frames[0].payload.as_ref(), b"Walls:5:6:\n");
        }

        #[test]
        fn malformed_envelope_resumes_scanning() {
            let mut buf = BytesMut::from(&b"noiseSTART 1x||Message||"[..]);
            buf.extend_from_slice(&wire(&[("Message", &b"ok"[..])]));

            let mut codec = SerialCodec::new();
            let frame = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(frame.payload.as_ref(), b"ok");
            assert!(buf.is_empty());
        }

        #[test]
        fn truncated_tail_is_discarded_at_eof() {
            let mut buf = BytesMut::from(&b"START   10||Message||abc"[..]);
            let mut codec = SerialCodec::new();
            assert!(codec.decode_eof(&mut buf).unwrap().is_none());
            assert!(buf.is_empty());
        }

        #[tokio::test]
        async fn framed_reader_yields_frames_in_order() {
            let mut bytes = b"STST".to_vec();
            bytes.extend_from_slice(&wire(&[("Message", &b"one"[..]), ("Image:1:2:0", &b"two"[..])]));

            let mut stream = framed(&bytes[..]);
            let first = stream.next().await.unwrap().unwrap();
            let second = stream.next().await.unwrap().unwrap();

            assert_eq!(first.payload.as_ref(), b"one");
            assert_eq!(second.tag, "Image:1:2:0");
            assert!(stream.next().await.is_none());
        }
    }
}
