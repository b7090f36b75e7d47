//! OS file adapted to the [`BoundedStream`] contract.

use super::{BoundedStream, read_only_error, resolve_seek};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// File handle that tracks its own length and position.
///
/// Reads stop at the file's current length. Writes behave like a file (they may
/// extend it) and are rejected up front when the file was opened read-only.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    len: u64,
    pos: u64,
    writable: bool,
}

impl FileStream {
    /// # Errors
    ///
    /// Fails if the file metadata or position cannot be read.
    pub fn new(mut file: File, writable: bool) -> io::Result<Self> {
        let len = file.metadata()?.len();
        let pos = file.stream_position()?;
        Ok(Self {
            file,
            len,
            pos,
            writable,
        })
    }

    pub fn into_inner(self) -> File {
        self.file
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.len.saturating_sub(self.pos);
        let want = usize::try_from(left).map_or(buf.len(), |l| l.min(buf.len()));
        if want == 0 {
            return Ok(0);
        }
        let n = self.file.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(read_only_error());
        }
        self.file.write_all(buf)?;
        self.pos += buf.len() as u64;
        self.len = self.len.max(self.pos);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = resolve_seek(self.pos, self.len, from, i64::MAX as u64)?;
        self.pos = self.file.seek(SeekFrom::Start(target))?;
        Ok(self.pos)
    }
}

impl BoundedStream for FileStream {
    fn len(&self) -> u64 {
        self.len
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        if !self.writable {
            return Err(read_only_error());
        }
        self.file.set_len(len)?;
        self.len = len;
        Ok(())
    }

    fn can_write(&self) -> bool {
        self.writable
    }
}
