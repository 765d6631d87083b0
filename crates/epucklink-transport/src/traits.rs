use std::io::{Cursor, ErrorKind, Read};

use tracing::trace;

/// A blocking-with-timeout byte reader.
///
/// `read` blocks for at most the source's timeout and returns `Ok(0)` when
/// nothing arrived, so a zero-length read means "timed out", not EOF.
pub trait ByteSource: Read {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> std::io::Result<usize>;

    /// Release the underlying device. Reads after `close` fail.
    fn close(&mut self) -> std::io::Result<()>;
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()) as usize)
    }

    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        (**self).bytes_available()
    }

    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}

/// Read and discard everything currently buffered by `source`.
///
/// Returns the number of bytes dropped. Never waits for new data beyond what
/// `bytes_available` reported.
pub fn drain_available<S: ByteSource + ?Sized>(source: &mut S) -> std::io::Result<usize> {
    let mut scratch = [0u8; 512];
    let mut dropped = 0usize;

    loop {
        let pending = source.bytes_available()?;
        if pending == 0 {
            break;
        }

        let want = pending.min(scratch.len());
        match source.read(&mut scratch[..want]) {
            Ok(0) => break,
            Ok(n) => dropped += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    if dropped > 0 {
        trace!(dropped, "drained buffered bytes");
    }
    Ok(dropped)
}
