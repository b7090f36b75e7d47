//! Storage providers: where units read inputs from and write outputs to.
//!
//! A [`StorageProvider`] answers existence and enumeration queries and hands out
//! [`BoundedStream`]s. Three implementations ship with the crate:
//!
//! - [`RealStorage`] passes everything through to the OS;
//! - [`ParallelAccess`] wraps any provider and copies every read stream that is
//!   not already in memory into a private buffer, so concurrent readers never
//!   share a cursor or a file handle;
//! - [`VirtualStorage`] wraps a delegate for reads and buffers all writes in
//!   memory until a coordinator commits them with [`VirtualStorage::commit_to`].
//!
//! ```
//! use binmill::storage::{OpenMode, RealStorage, StorageProvider, VirtualStorage};
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! # fn main() -> binmill::Result<()> {
//! let vfs = VirtualStorage::new(Arc::new(RealStorage::new()));
//! let mut out = vfs.open_write("out/a.bin".as_ref(), OpenMode::Create)?;
//! out.write_all(b"\x01\x02")?;
//! assert!(vfs.file_exists("OUT/A.BIN".as_ref()));
//! assert_eq!(vfs.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod parallel;
pub mod real;
pub mod virtualized;

pub use parallel::ParallelAccess;
pub use real::RealStorage;
pub use virtualized::{BufferedFile, VirtualStorage};

use crate::error::Result;
use crate::stream::BoundedStream;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How an open call treats an existing or missing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OpenMode {
    /// The file must exist.
    #[default]
    Open,
    /// Create the file, truncating it if it exists.
    Create,
    /// Create the file; fail if it exists.
    CreateNew,
    /// Open the file, creating it if missing.
    OpenOrCreate,
    /// Open an existing file and truncate it.
    Truncate,
    /// Open or create the file and position at its end.
    Append,
}

impl OpenMode {
    #[must_use]
    pub fn creates(self) -> bool {
        matches!(
            self,
            Self::Create | Self::CreateNew | Self::OpenOrCreate | Self::Append
        )
    }

    /// Translate to [`OpenOptions`]. `write` asks for write access; modes that
    /// create or truncate get it regardless, since std requires it.
    #[must_use]
    pub fn options(self, write: bool) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(true);
        match self {
            Self::Open => {}
            Self::Create => {
                opts.create(true).truncate(true);
            }
            Self::CreateNew => {
                opts.create_new(true);
            }
            Self::OpenOrCreate => {
                opts.create(true);
            }
            Self::Truncate => {
                opts.truncate(true);
            }
            Self::Append => {
                opts.append(true).create(true);
            }
        }
        if write || (self != Self::Open && self != Self::Append) {
            opts.write(true);
        }
        opts
    }
}

/// File and directory access as seen by a processing unit.
pub trait StorageProvider: Send + Sync {
    /// Open `path` for reading.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing path; OS failures otherwise.
    fn open_read(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>>;

    /// Open `path` for writing.
    ///
    /// # Errors
    ///
    /// OS failures, unchanged.
    fn open_write(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>>;

    /// Files directly inside `dir`, sorted.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing directory; OS failures otherwise.
    fn enumerate_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Directories directly inside `dir`, sorted.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing directory; OS failures otherwise.
    fn enumerate_directories(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Create `path` and any missing parents. `Ok(false)` if it already existed.
    ///
    /// # Errors
    ///
    /// OS failures, unchanged.
    fn create_directory(&self, path: &Path) -> Result<bool>;

    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;
}

impl<P: StorageProvider + ?Sized> StorageProvider for Arc<P> {
    fn open_read(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        (**self).open_read(path, mode)
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        (**self).open_write(path, mode)
    }

    fn enumerate_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        (**self).enumerate_files(dir)
    }

    fn enumerate_directories(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        (**self).enumerate_directories(dir)
    }

    fn create_directory(&self, path: &Path) -> Result<bool> {
        (**self).create_directory(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        (**self).file_exists(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        (**self).directory_exists(path)
    }
}
