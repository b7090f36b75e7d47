use super::{OpenMode, StorageProvider};
use crate::error::{Error, Result};
use crate::stream::{BoundedStream, FileStream};
use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Direct passthrough to the OS filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealStorage;

impl RealStorage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path, mode: OpenMode, write: bool) -> Result<FileStream> {
        let mut file = mode.options(write).open(path).map_err(|e| locate(e, path))?;
        if mode == OpenMode::Append {
            file.seek(SeekFrom::End(0))?;
        }
        log::trace!("opened {} ({mode:?}, write={write})", path.display());
        Ok(FileStream::new(file, write)?)
    }

    fn list(dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| locate(e, dir))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() == want_dirs {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Attach the path to a not-found error; pass everything else through.
fn locate(err: io::Error, path: &Path) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::not_found(format!("{} does not exist", path.display()))
    } else {
        Error::from(err)
    }
}

impl StorageProvider for RealStorage {
    fn open_read(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        Ok(Box::new(Self::open(path, mode, false)?))
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> Result<Box<dyn BoundedStream>> {
        Ok(Box::new(Self::open(path, mode, true)?))
    }

    fn enumerate_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Self::list(dir, false)
    }

    fn enumerate_directories(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Self::list(dir, true)
    }

    fn create_directory(&self, path: &Path) -> Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(path)?;
        Ok(true)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
