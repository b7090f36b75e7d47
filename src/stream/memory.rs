//! Fixed-length stream over an owned or borrowed memory region.

use super::{
    BoundedStream, MAX_MEMORY_POSITION, fixed_length_error, read_from_slice, read_only_error,
    resolve_seek, write_to_slice,
};
use std::io::{self, Read, Seek, SeekFrom, Write};

#[derive(Debug)]
enum Region<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
    Shared(&'a [u8]),
}

impl Region<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Region::Owned(v) => v,
            Region::Borrowed(s) => s,
            Region::Shared(s) => s,
        }
    }

    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Region::Owned(v) => Some(v),
            Region::Borrowed(s) => Some(s),
            Region::Shared(_) => None,
        }
    }
}

/// Seekable stream over a fixed-length memory region.
///
/// Built from a mutable region the stream reads and writes; built from an
/// immutable one (or via [`MemoryStream::read_only`]) every write fails with
/// `InvalidOperation`. The length never changes.
#[derive(Debug)]
pub struct MemoryStream<'a> {
    region: Region<'a>,
    writable: bool,
    pos: u64,
}

impl<'a> MemoryStream<'a> {
    /// Read-write stream over a borrowed region.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            region: Region::Borrowed(data),
            writable: true,
            pos: 0,
        }
    }

    /// Read-only stream over a borrowed region.
    pub fn read_only(data: &'a [u8]) -> Self {
        Self {
            region: Region::Shared(data),
            writable: false,
            pos: 0,
        }
    }

    /// The whole region, independent of the position.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.region.bytes()
    }
}

impl MemoryStream<'static> {
    /// Read-write stream that owns its buffer.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            region: Region::Owned(data),
            writable: true,
            pos: 0,
        }
    }

    /// Read-only stream that owns its buffer.
    #[must_use]
    pub fn from_vec_read_only(data: Vec<u8>) -> Self {
        Self {
            region: Region::Owned(data),
            writable: false,
            pos: 0,
        }
    }

    /// Give back the owned buffer, if this stream owns one.
    #[must_use]
    pub fn into_vec(self) -> Option<Vec<u8>> {
        match self.region {
            Region::Owned(v) => Some(v),
            _ => None,
        }
    }
}

impl Read for MemoryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(read_from_slice(self.region.bytes(), &mut self.pos, buf))
    }
}

impl Write for MemoryStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(read_only_error());
        }
        match self.region.bytes_mut() {
            Some(dst) => write_to_slice(dst, &mut self.pos, buf),
            None => Err(read_only_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream<'_> {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.len(), from, MAX_MEMORY_POSITION)?;
        Ok(self.pos)
    }
}

impl BoundedStream for MemoryStream<'_> {
    fn len(&self) -> u64 {
        self.region.bytes().len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn set_len(&mut self, _len: u64) -> io::Result<()> {
        Err(fixed_length_error())
    }

    fn can_write(&self) -> bool {
        self.writable
    }

    fn is_materialized(&self) -> bool {
        true
    }
}
