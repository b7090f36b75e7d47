//! Processing units: one transformation task over one input.
//!
//! A unit runs under one of two strategies:
//!
//! - **Direct** ([`DirectUnit`]): a single action, executed at most once.
//! - **Segmented** ([`SegmentedUnit`]): a lazy producer of artifacts, pulled one
//!   at a time by the caller.
//!
//! While a unit's own code runs, its [`UnitContext`] is published as the
//! current unit of the running thread (see [`context`]), so helper code can find
//! the unit's storage, paths and logger without having them passed in. The
//! context is cleared before control returns to the caller, on success, error
//! or panic.
//!
//! ```
//! use binmill::storage::{RealStorage, VirtualStorage};
//! use binmill::unit::{context, Artifact, ProcessingUnit, UnitContext};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let storage = Arc::new(VirtualStorage::new(Arc::new(RealStorage::new())));
//! let ctx = Arc::new(UnitContext::new("split", storage.clone()).with_output_root("out"));
//!
//! let mut unit = ProcessingUnit::segmented(ctx, (0u8..3).map(|i| {
//!     // the producer runs with the unit published
//!     assert!(context::is_active());
//!     Ok(Artifact::new(format!("part{i}.bin"), vec![i]))
//! }));
//!
//! let written = unit.drive(|ctx, artifact| artifact.write_to(ctx))?;
//! assert_eq!(written, 3);
//! assert_eq!(storage.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod context;
mod direct;
mod segmented;

pub use direct::{DirectState, DirectUnit};
pub use segmented::{SegmentedState, SegmentedUnit};

use crate::error::Result;
use crate::logging::{LogSink, NullSink};
use crate::storage::{OpenMode, StorageProvider};
use crate::stream::BoundedStream;
use log::Level;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a running unit can reach: identity, paths, storage and logger.
pub struct UnitContext {
    name: String,
    input: PathBuf,
    output_root: PathBuf,
    storage: Arc<dyn StorageProvider>,
    logger: Arc<dyn LogSink>,
    args: Vec<String>,
}

impl UnitContext {
    pub fn new(name: impl Into<String>, storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            name: name.into(),
            input: PathBuf::new(),
            output_root: PathBuf::new(),
            storage,
            logger: Arc::new(NullSink),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    #[must_use]
    pub fn logger(&self) -> &Arc<dyn LogSink> {
        &self.logger
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn output_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output_root.join(relative)
    }

    /// # Errors
    ///
    /// `NotFound` if the input is missing.
    pub fn open_input(&self) -> Result<Box<dyn BoundedStream>> {
        self.storage.open_read(&self.input, OpenMode::Open)
    }

    /// Create (or replace) `relative` under the output root, creating its parent
    /// directory through the unit's storage.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn open_output(&self, relative: impl AsRef<Path>) -> Result<Box<dyn BoundedStream>> {
        let path = self.output_path(relative);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.storage.create_directory(parent)?;
        }
        self.storage.open_write(&path, OpenMode::Create)
    }

    pub fn log(&self, level: Level, message: &str) {
        if self.logger.enabled(level) {
            self.logger.log(level, message);
        }
    }
}

impl fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output_root", &self.output_root)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Which execution strategy a unit uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Segmented,
}

/// One output of a segmented unit. `path` is relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Write the artifact under the context's output root.
    ///
    /// # Errors
    ///
    /// Propagates storage and write failures.
    pub fn write_to(&self, ctx: &UnitContext) -> anyhow::Result<()> {
        let mut out = ctx.open_output(&self.path)?;
        out.write_all(&self.data)?;
        out.flush()?;
        Ok(())
    }
}

/// A unit under either strategy, as built by a [`UnitFactory`](crate::runner::UnitFactory).
pub enum ProcessingUnit {
    Direct(DirectUnit),
    Segmented(SegmentedUnit<Artifact>),
}

impl ProcessingUnit {
    pub fn direct<F>(context: Arc<UnitContext>, action: F) -> Self
    where
        F: FnOnce(&UnitContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::Direct(DirectUnit::new(context, action))
    }

    pub fn segmented<I>(context: Arc<UnitContext>, producer: I) -> Self
    where
        I: IntoIterator<Item = anyhow::Result<Artifact>>,
        I::IntoIter: Send + 'static,
    {
        Self::Segmented(SegmentedUnit::new(context, producer))
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Direct(_) => Strategy::Direct,
            Self::Segmented(_) => Strategy::Segmented,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<UnitContext> {
        match self {
            Self::Direct(u) => u.context(),
            Self::Segmented(u) => u.context(),
        }
    }

    /// Run the unit to the end.
    ///
    /// Segmented artifacts are passed to `consume` one at a time, outside the
    /// published context. Returns the number of artifacts consumed (0 for Direct).
    ///
    /// # Errors
    ///
    /// The first fault from the unit or from `consume`, unchanged.
    pub fn drive<F>(&mut self, mut consume: F) -> anyhow::Result<usize>
    where
        F: FnMut(&UnitContext, Artifact) -> anyhow::Result<()>,
    {
        match self {
            Self::Direct(unit) => {
                unit.run()?;
                Ok(0)
            }
            Self::Segmented(unit) => {
                let ctx = Arc::clone(unit.context());
                let mut count = 0;
                while let Some(artifact) = unit.next_artifact() {
                    consume(&ctx, artifact?)?;
                    count += 1;
                }
                Ok(count)
            }
        }
    }
}
