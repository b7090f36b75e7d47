//! Stream over foreign memory addressed by a raw pointer.

use super::{
    BoundedStream, MAX_MEMORY_POSITION, fixed_length_error, read_from_slice, resolve_seek,
    write_to_slice,
};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ptr::NonNull;

/// Fixed-length read-write stream over memory the caller owns.
///
/// The stream never frees the region. Once constructed it behaves exactly like a
/// writable [`MemoryStream`](super::MemoryStream); the only unsafe step is
/// [`RawMemoryStream::from_raw_parts`].
#[derive(Debug)]
pub struct RawMemoryStream {
    ptr: NonNull<u8>,
    len: usize,
    pos: u64,
}

// SAFETY: the constructor's contract makes the caller guarantee exclusive access
// to the region for the stream's lifetime, so moving the stream to another
// thread moves that exclusive access with it.
unsafe impl Send for RawMemoryStream {}

impl RawMemoryStream {
    /// Wrap `len` bytes starting at `ptr`.
    ///
    /// A null `ptr` is accepted only with `len == 0`.
    ///
    /// # Safety
    ///
    /// For as long as the stream (or anything it is moved into) lives, `ptr` must
    /// be valid for reads and writes of `len` bytes, and no other code may access
    /// that memory.
    #[must_use]
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => Self { ptr, len, pos: 0 },
            None => Self {
                ptr: NonNull::dangling(),
                len: 0,
                pos: 0,
            },
        }
    }

    fn region(&self) -> &[u8] {
        // SAFETY: validity and exclusivity are guaranteed by `from_raw_parts`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn region_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` keeps this the only live view.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Read for RawMemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pos = self.pos;
        let n = read_from_slice(self.region(), &mut pos, buf);
        self.pos = pos;
        Ok(n)
    }
}

impl Write for RawMemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pos = self.pos;
        let n = write_to_slice(self.region_mut(), &mut pos, buf)?;
        self.pos = pos;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for RawMemoryStream {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.len as u64, from, MAX_MEMORY_POSITION)?;
        Ok(self.pos)
    }
}

impl BoundedStream for RawMemoryStream {
    fn len(&self) -> u64 {
        self.len as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn set_len(&mut self, _len: u64) -> io::Result<()> {
        Err(fixed_length_error())
    }

    fn can_write(&self) -> bool {
        true
    }
}
