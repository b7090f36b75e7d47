//! Growable in-memory stream whose content outlives the stream itself.

use super::{BoundedStream, resolve_seek};
use crate::error::Error;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a growable byte buffer.
///
/// The virtual storage provider keeps one handle per buffered file and gives the
/// writer a [`BufferStream`] over another handle to the same bytes.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(data)),
        }
    }

    /// # Panics
    ///
    /// Panics if the buffer mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current content.
    ///
    /// # Panics
    ///
    /// Panics if the buffer mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().expect("buffer mutex poisoned")
    }
}

/// Read-write stream over a [`SharedBuffer`].
///
/// Writes past the end grow the buffer, zero-filling any gap left by a seek.
#[derive(Debug)]
pub struct BufferStream {
    buffer: SharedBuffer,
    pos: u64,
}

impl BufferStream {
    #[must_use]
    pub fn new(buffer: SharedBuffer) -> Self {
        Self { buffer, pos: 0 }
    }

    #[must_use]
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }
}

impl Read for BufferStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.buffer.lock();
        Ok(super::read_from_slice(&data, &mut self.pos, buf))
    }
}

impl Write for BufferStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let start = usize::try_from(self.pos)
            .map_err(|_| Error::io_fault(format!("position {} not addressable", self.pos)))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| Error::io_fault("write would overflow the buffer"))?;
        let mut data = self.buffer.lock();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        drop(data);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for BufferStream {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.len(), from, i64::MAX as u64)?;
        Ok(self.pos)
    }
}

impl BoundedStream for BufferStream {
    fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| Error::invalid_operation(format!("length {len} not addressable")))?;
        self.buffer.lock().resize(len, 0);
        Ok(())
    }

    fn can_write(&self) -> bool {
        true
    }

    fn is_materialized(&self) -> bool {
        true
    }
}
