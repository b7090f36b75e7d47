//! Bounded window onto another stream, e.g. a file embedded in an archive.

use super::{BoundedStream, resolve_seek};
use crate::error::Error;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Exposes `[0, len)` mapped onto `[offset, offset + len)` of the wrapped stream.
///
/// `offset` is the wrapped stream's position when the window is created. Reads
/// and writes never move the wrapped stream past `offset + len`.
#[derive(Debug)]
pub struct WindowStream<S> {
    inner: S,
    offset: u64,
    len: u64,
    pos: u64,
}

impl<S: Read + Write + Seek> WindowStream<S> {
    /// Open a window of `len` bytes starting at the current position of `inner`.
    ///
    /// # Errors
    ///
    /// Fails if the position of `inner` cannot be queried.
    pub fn new(mut inner: S, len: u64) -> io::Result<Self> {
        let offset = inner.stream_position()?;
        Ok(Self {
            inner,
            offset,
            len,
            pos: 0,
        })
    }

    /// Absolute offset of the window inside the wrapped stream.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    fn sync_inner(&mut self) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(self.offset + self.pos))?;
        Ok(())
    }
}

impl<S: Read + Write + Seek> Read for WindowStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = usize::try_from(self.remaining()).map_or(buf.len(), |r| r.min(buf.len()));
        if want == 0 {
            return Ok(0);
        }
        self.sync_inner()?;
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Read + Write + Seek> Write for WindowStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if (buf.len() as u64) > self.remaining() {
            return Err(Error::io_fault(format!(
                "write of {} byte(s) at position {} exceeds window length {}",
                buf.len(),
                self.pos,
                self.len
            ))
            .into());
        }
        self.sync_inner()?;
        self.inner.write_all(buf)?;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Read + Write + Seek> Seek for WindowStream<S> {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let max = u64::MAX - self.offset;
        self.pos = resolve_seek(self.pos, self.len, from, max)?;
        Ok(self.pos)
    }
}

impl<S: Read + Write + Seek + Send> BoundedStream for WindowStream<S> {
    fn len(&self) -> u64 {
        self.len
    }

    fn position(&self) -> u64 {
        self.pos
    }

    /// Resize the window. The wrapped stream is not touched.
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.len = len;
        Ok(())
    }

    fn can_write(&self) -> bool {
        true
    }
}
