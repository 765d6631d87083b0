use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use epucklink_transport::ByteSource;
use tracing::{debug, trace};

use crate::codec::{FrameConfig, RawFrame};
use crate::envelope::{Envelope, EnvelopeParser};
use crate::error::{FrameError, Result, Stage};
use crate::sync::{Synchronizer, MARKER};

/// Reads complete frames from any [`ByteSource`].
///
/// Marker and envelope are consumed one byte at a time and the payload in
/// bounded chunks, so a frame never consumes a byte past its own payload.
pub struct FrameReader<S> {
    inner: S,
    sync: Synchronizer,
    envelope: EnvelopeParser,
    config: FrameConfig,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: S, config: FrameConfig) -> Self {
        Self {
            inner,
            sync: Synchronizer::new(),
            envelope: EnvelopeParser::new(config.max_payload_size, config.max_tag_len),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Any error abandons the frame in progress. The next call starts a fresh
    /// marker scan from wherever the stream currently is.
    pub fn read_frame(&mut self) -> Result<RawFrame> {
        self.read_frame_while(|| true)
    }

    /// Like [`read_frame`](Self::read_frame), but `keep_waiting` is asked
    /// after every empty payload read. Returning false abandons the frame
    /// with a payload timeout, even when `max_payload_stalls` is unlimited.
    pub fn read_frame_while<F>(&mut self, keep_waiting: F) -> Result<RawFrame>
    where
        F: FnMut() -> bool,
    {
        self.sync.reset();
        self.envelope.reset();

        self.synchronize()?;
        let Envelope { length, tag } = self.read_envelope()?;
        let payload = self.read_payload(length, keep_waiting)?;

        debug!(%tag, length, "frame read");
        Ok(RawFrame {
            tag,
            length,
            payload,
        })
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn synchronize(&mut self) -> Result<()> {
        let mut consumed = 0usize;
        loop {
            let byte = self.read_byte(Stage::Sync)?;
            consumed += 1;
            if self.sync.feed(byte) {
                let skipped = consumed - MARKER.len();
                if skipped > 0 {
                    debug!(skipped, "resynchronized on marker");
                }
                return Ok(());
            }
        }
    }

    fn read_envelope(&mut self) -> Result<Envelope> {
        loop {
            let byte = self.read_byte(Stage::Envelope)?;
            if let Some(envelope) = self.envelope.feed(byte)? {
                return Ok(envelope);
            }
        }
    }

    fn read_payload<F>(&mut self, length: usize, mut keep_waiting: F) -> Result<Bytes>
    where
        F: FnMut() -> bool,
    {
        let mut payload = BytesMut::with_capacity(length);
        let mut chunk = vec![0u8; self.config.payload_chunk_size.clamp(1, length.max(1))];
        let mut stalls = 0usize;

        while payload.len() < length {
            let want = (length - payload.len()).min(chunk.len());
            let stalled = match self.inner.read(&mut chunk[..want]) {
                Ok(0) => true,
                Ok(n) => {
                    stalls = 0;
                    payload.extend_from_slice(&chunk[..n]);
                    false
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => false,
                Err(err) if is_timeout(&err) => true,
                Err(err) => return Err(FrameError::Io(err)),
            };
            if !stalled {
                continue;
            }

            stalls += 1;
            trace!(received = payload.len(), length, stalls, "payload read stalled");
            let over_limit = self
                .config
                .max_payload_stalls
                .is_some_and(|max| stalls > max);
            if over_limit || !keep_waiting() {
                debug!(received = payload.len(), length, "payload abandoned");
                return Err(FrameError::Timeout {
                    stage: Stage::Payload,
                });
            }
        }

        Ok(payload.freeze())
    }

    fn read_byte(&mut self, stage: Stage) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(FrameError::Timeout { stage }),
                Ok(_) => return Ok(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Err(FrameError::Timeout { stage }),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
