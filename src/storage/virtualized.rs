use super::{OpenMode, StorageProvider};
use crate::error::Result;
use crate::stream::{BoundedStream, BufferStream, MemoryStream, SharedBuffer};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// One buffered write, as yielded when iterating a [`VirtualStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferedFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub offset: usize,
    pub length: usize,
}

impl BufferedFile {
    /// The committed byte range of `content`.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.content[self.offset..self.offset + self.length]
    }
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    key: String,
    buffer: SharedBuffer,
}

/// Provider that never writes to disk.
///
/// Reads, enumeration and existence checks go to the delegate. `open_write`
/// hands out a [`BufferStream`] over a fresh in-memory buffer and records the
/// path (plus its parent directory) so existence checks see it. Path lookups
/// are case-insensitive.
///
/// Opening a path that is already buffered replaces the earlier buffer in its
/// original slot, unless the mode is [`OpenMode::Append`], which continues it.
/// Buffered files do not show up in `enumerate_files`.
pub struct VirtualStorage {
    delegate: Arc<dyn StorageProvider>,
    entries: Mutex<Vec<Entry>>,
    directories: Mutex<Vec<String>>,
}

impl VirtualStorage {
    pub fn new(delegate: Arc<dyn StorageProvider>) -> Self {
        Self {
            delegate,
            entries: Mutex::new(Vec::new()),
            directories: Mutex::new(Vec::new()),
        }
    }

    /// Number of buffered files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every buffered file, in the order first written.
    #[must_use]
    pub fn files(&self) -> Vec<BufferedFile> {
        self.entries()
            .iter()
            .map(|e| {
                let content = e.buffer.snapshot();
                BufferedFile {
                    path: e.path.clone(),
                    length: content.len(),
                    offset: 0,
                    content,
                }
            })
            .collect()
    }

    /// Write every buffered file through `target`, in order, creating parent
    /// directories as needed. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Stops at the first failing file and returns its error.
    pub fn commit_to(&self, target: &dyn StorageProvider) -> Result<u64> {
        let mut total = 0u64;
        for file in self.files() {
            if let Some(parent) = file.path.parent()
                && !parent.as_os_str().is_empty()
            {
                target.create_directory(parent)?;
            }
            let mut out = target.open_write(&file.path, OpenMode::Create)?;
            out.write_all(file.bytes())?;
            out.flush()?;
            total += file.length as u64;
            log::debug!("committed {} ({} bytes)", file.path.display(), file.length);
        }
        Ok(total)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().expect("entries mutex poisoned")
    }

    fn directories(&self) -> MutexGuard<'_, Vec<String>> {
        self.directories.lock().expect("directories mutex poisoned")
    }

    fn buffered(&self, key: &str) -> Option<SharedBuffer> {
        self.entries()
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.buffer.clone())
    }

    fn record_directory(&self, key: String) -> bool {
        let mut dirs = self.directories();
        if dirs.contains(&key) {
            return false;
        }
        dirs.push(key);
        true
    }
}

/// Case-insensitive lookup key: `/` separators, no trailing separator, lowercase.
fn path_key(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    let s = s.strip_prefix("./").unwrap_or(&s);
    s.trim_end_matches('/').to_lowercase()
}

impl StorageProvider for VirtualStorage {
    fn open_read(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        match self.buffered(&path_key(path)) {
            Some(buffer) => Ok(Box::new(MemoryStream::from_vec_read_only(buffer.snapshot()))),
            None => self.delegate.open_read(path, mode),
        }
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        let key = path_key(path);
        let buffer = {
            let mut entries = self.entries();
            match entries.iter_mut().find(|e| e.key == key) {
                Some(existing) if mode == OpenMode::Append => existing.buffer.clone(),
                Some(existing) => {
                    log::warn!(
                        "{} written more than once; keeping the latest content",
                        path.display()
                    );
                    existing.buffer = SharedBuffer::new();
                    existing.buffer.clone()
                }
                None => {
                    let buffer = SharedBuffer::new();
                    entries.push(Entry {
                        path: path.to_path_buf(),
                        key,
                        buffer: buffer.clone(),
                    });
                    buffer
                }
            }
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.record_directory(path_key(parent));
        }
        let mut stream = BufferStream::new(buffer);
        if mode == OpenMode::Append {
            stream.seek(SeekFrom::End(0))?;
        }
        Ok(Box::new(stream))
    }

    fn enumerate_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.delegate.enumerate_files(dir)
    }

    fn enumerate_directories(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.delegate.enumerate_directories(dir)
    }

    fn create_directory(&self, path: &Path) -> Result<bool> {
        let existed = self.directory_exists(path);
        self.record_directory(path_key(path));
        Ok(!existed)
    }

    fn file_exists(&self, path: &Path) -> bool {
        let key = path_key(path);
        self.entries().iter().any(|e| e.key == key) || self.delegate.file_exists(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        let key = path_key(path);
        let prefix = format!("{key}/");
        let recorded = self
            .directories()
            .iter()
            .any(|d| *d == key || d.starts_with(&prefix));
        recorded || self.delegate.directory_exists(path)
    }
}

impl IntoIterator for &VirtualStorage {
    type Item = BufferedFile;
    type IntoIter = std::vec::IntoIter<BufferedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files().into_iter()
    }
}
