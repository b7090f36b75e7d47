//! Testing utilities for units and storage code.
//!
//! - [`MemorySink`]: a [`LogSink`] that keeps every message for assertions.
//! - [`TempWorkspace`]: a temporary directory with helpers to seed input files
//!   and read outputs back, deleted when dropped.
//!
//! ```
//! use binmill::testing::TempWorkspace;
//!
//! # fn main() -> std::io::Result<()> {
//! let ws = TempWorkspace::new()?;
//! let input = ws.write_file("in/a.bin", b"\x00\x01")?;
//! assert!(input.is_file());
//! assert_eq!(ws.read_file("in/a.bin")?, vec![0, 1]);
//! # Ok(())
//! # }
//! ```

use crate::logging::LogSink;
use log::Level;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records `(level, message)` pairs. Cloning shares the same record.
#[derive(Clone, Debug)]
pub struct MemorySink {
    min_level: Level,
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemorySink {
    /// Keep everything down to `Trace`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(Level::Trace)
    }

    /// Keep messages at `min_level` or more severe.
    #[must_use]
    pub fn with_level(min_level: Level) -> Self {
        Self {
            min_level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// # Panics
    ///
    /// Panics if the entries mutex is poisoned.
    #[must_use]
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().expect("entries mutex poisoned").clone()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, m)| m).collect()
    }

    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        if self.enabled(level) {
            self.entries
                .lock()
                .expect("entries mutex poisoned")
                .push((level, message.to_string()));
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level <= self.min_level
    }
}

/// A temporary directory that is automatically deleted when dropped.
pub struct TempWorkspace {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempWorkspace {
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }

    /// Write `data` to `relative`, creating parent directories. Returns the full path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be written.
    pub fn write_file(&self, relative: impl AsRef<Path>, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.file_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(path)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, relative: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        fs::read(self.file_path(relative))
    }
}
