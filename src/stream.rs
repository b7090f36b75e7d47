//! Seekable, length-bounded byte streams.
//!
//! Every stream here implements [`Read`], [`Write`] and [`Seek`] plus the
//! [`BoundedStream`] contract:
//!
//! - a read returns the number of bytes actually transferred, clamped to the
//!   caller's buffer and the bytes left before `len()`; reaching the end is `Ok(0)`,
//!   never an error;
//! - a write is all-or-nothing: a write that does not fit is rejected with
//!   [`ErrorKind::IoFault`](crate::ErrorKind::IoFault) and nothing moves;
//! - writing to a read-only stream fails with
//!   [`ErrorKind::InvalidOperation`](crate::ErrorKind::InvalidOperation) and the
//!   position is left alone.
//!
//! ## Implementations
//!
//! | Type | Backing | `set_len` |
//! |---|---|---|
//! | [`MemoryStream`] | owned `Vec<u8>`, borrowed `&mut [u8]` or read-only `&[u8]` | unsupported |
//! | [`RawMemoryStream`] | caller-owned raw address (`unsafe` to construct) | unsupported |
//! | [`WindowStream`] | `[offset, offset + len)` of another stream | adjusts the window only |
//! | [`BufferStream`] | shared growable buffer | resizes the buffer |
//! | [`FileStream`] | OS file | truncates / extends the file |
//!
//! The first three are fixed-extent; the last two back storage providers.

pub mod buffer;
pub mod file;
pub mod memory;
pub mod raw;
pub mod window;

pub use buffer::{BufferStream, SharedBuffer};
pub use file::FileStream;
pub use memory::MemoryStream;
pub use raw::RawMemoryStream;
pub use window::WindowStream;

use crate::error::Error;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Largest position a fixed memory-backed stream accepts (32-bit position space).
pub const MAX_MEMORY_POSITION: u64 = i32::MAX as u64;

/// Shared contract of all streams handed out by this crate.
pub trait BoundedStream: Read + Write + Seek + Send {
    /// Current logical length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current logical position. May exceed `len()` after a seek past the end.
    fn position(&self) -> u64;

    /// Change the logical length.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for fixed-extent streams.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    fn can_write(&self) -> bool;

    /// Whether the whole content already lives in memory owned by this stream.
    fn is_materialized(&self) -> bool {
        false
    }
}

impl<S: BoundedStream + ?Sized> BoundedStream for Box<S> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        (**self).set_len(len)
    }

    fn can_write(&self) -> bool {
        (**self).can_write()
    }

    fn is_materialized(&self) -> bool {
        (**self).is_materialized()
    }
}

/// Copy the whole of `stream` (from its start) into a fresh vector.
///
/// The stream is left positioned at its end.
///
/// # Errors
///
/// Propagates seek and read failures.
pub fn read_to_vec<S: BoundedStream + ?Sized>(stream: &mut S) -> io::Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(0))?;
    let mut out = Vec::with_capacity(usize::try_from(stream.len()).unwrap_or(0));
    stream.read_to_end(&mut out)?;
    Ok(out)
}

/// Resolve a seek request against a stream of length `len`.
pub(crate) fn resolve_seek(current: u64, len: u64, from: SeekFrom, max: u64) -> io::Result<u64> {
    let (base, delta) = match from {
        SeekFrom::Start(n) => (0u64, i128::from(n)),
        SeekFrom::Current(d) => (current, i128::from(d)),
        SeekFrom::End(d) => (len, i128::from(d)),
    };
    let target = i128::from(base) + delta;
    if target < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek before the start of the stream",
        ));
    }
    if target > i128::from(max) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("seek target {target} beyond the addressable range {max}"),
        ));
    }
    Ok(target as u64)
}

/// Clamped read out of `src` at `*pos`.
pub(crate) fn read_from_slice(src: &[u8], pos: &mut u64, buf: &mut [u8]) -> usize {
    let Ok(start) = usize::try_from(*pos) else {
        return 0;
    };
    if start >= src.len() {
        return 0;
    }
    let n = buf.len().min(src.len() - start);
    buf[..n].copy_from_slice(&src[start..start + n]);
    *pos += n as u64;
    n
}

/// Strict write into `dst` at `*pos`: the whole of `buf` or nothing.
pub(crate) fn write_to_slice(dst: &mut [u8], pos: &mut u64, buf: &[u8]) -> io::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let fits = usize::try_from(*pos)
        .ok()
        .and_then(|start| start.checked_add(buf.len()).map(|end| (start, end)))
        .filter(|&(_, end)| end <= dst.len());
    let Some((start, end)) = fits else {
        return Err(Error::io_fault(format!(
            "write of {} byte(s) at position {} exceeds stream length {}",
            buf.len(),
            pos,
            dst.len()
        ))
        .into());
    };
    dst[start..end].copy_from_slice(buf);
    *pos = end as u64;
    Ok(buf.len())
}

pub(crate) fn read_only_error() -> io::Error {
    Error::invalid_operation("stream is read-only").into()
}

pub(crate) fn fixed_length_error() -> io::Error {
    Error::invalid_operation("stream length is fixed").into()
}
