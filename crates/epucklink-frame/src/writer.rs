use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, RawFrame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes frames in the firmware's wire format to any `Write` sink.
///
/// The robot only ever sends; this side exists to produce captures and to
/// drive loopback tests through a pty or file.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &RawFrame) -> Result<()> {
        self.send(&frame.tag, frame.payload.as_ref())
    }

    /// Encode and send a payload under `tag`.
    pub fn send(&mut self, tag: &str, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(tag, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => {
                    return Err(FrameError::Io(std::io::Error::from(ErrorKind::WriteZero)))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
