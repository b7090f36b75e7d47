use super::{OpenMode, StorageProvider};
use crate::error::Result;
use crate::stream::{BoundedStream, MemoryStream, read_to_vec};
use std::path::{Path, PathBuf};

/// Parallel-access mode for any provider.
///
/// Read streams that are not already held in memory are copied into a fresh
/// read-only [`MemoryStream`] before they are returned, so every concurrent
/// reader owns its own bytes and cursor. Streams that are already materialized
/// pass through. Everything else is delegated unchanged.
#[derive(Clone, Debug, Default)]
pub struct ParallelAccess<P> {
    inner: P,
}

impl<P: StorageProvider> ParallelAccess<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: StorageProvider> StorageProvider for ParallelAccess<P> {
    fn open_read(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        let mut stream = self.inner.open_read(path, mode)?;
        if stream.is_materialized() {
            return Ok(stream);
        }
        let bytes = read_to_vec(&mut stream)?;
        log::trace!("preloaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Box::new(MemoryStream::from_vec_read_only(bytes)))
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        self.inner.open_write(path, mode)
    }

    fn enumerate_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.inner.enumerate_files(dir)
    }

    fn enumerate_directories(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.inner.enumerate_directories(dir)
    }

    fn create_directory(&self, path: &Path) -> Result<bool> {
        self.inner.create_directory(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.inner.directory_exists(path)
    }
}
