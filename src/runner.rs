//! Reference batch coordinator: one processing unit per input.
//!
//! Inputs run in configuration order. Consecutive inputs tagged `parallel` form
//! a batch that runs on a rayon pool; each unit in the batch writes into its own
//! [`VirtualStorage`] and reads through [`ParallelAccess`], so nothing touches
//! disk mid-batch. When the batch is done, buffered output of the units that
//! succeeded is committed to real storage in input order; output of failed
//! units is dropped. Untagged inputs run one at a time directly against the
//! real provider (read through `ParallelAccess` when `preload` is set).
//!
//! A failing unit is recorded in the [`RunReport`] and does not stop the others.
//!
//! ```no_run
//! use binmill::metadata::ProcessorMetadata;
//! use binmill::runner::{FnFactory, InputSource, RunConfig, Runner};
//! use binmill::unit::{Artifact, ProcessingUnit};
//! use std::io::Read;
//!
//! # fn main() -> anyhow::Result<()> {
//! let factory = FnFactory::new(
//!     ProcessorMetadata::new("copy", "Copies each input").with_extensions(["bin"]),
//!     |ctx| {
//!         let mut data = Vec::new();
//!         ctx.open_input()?.read_to_end(&mut data)?;
//!         Ok(ProcessingUnit::segmented(ctx, [Ok(Artifact::new("copy.bin", data))]))
//!     },
//! );
//!
//! let config = RunConfig::new("out")
//!     .with_input(InputSource::new("data", "a.bin").parallel(true))
//!     .with_input(InputSource::new("data", "b.bin").parallel(true))
//!     .with_workers(4);
//!
//! let report = Runner::new(config).run(&factory)?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

use crate::logging::{LogCrateSink, LogSink};
use crate::metadata::ProcessorMetadata;
use crate::metrics::MetricsCollector;
use crate::storage::{ParallelAccess, RealStorage, StorageProvider, VirtualStorage};
use crate::unit::{ProcessingUnit, UnitContext};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One input: `base/relative`. Output lands under `output_root/<relative's parent>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSource {
    pub base: PathBuf,
    pub relative: PathBuf,
    /// Whether this input may run concurrently with its neighbours.
    #[serde(default)]
    pub parallel: bool,
}

impl InputSource {
    pub fn new(base: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            relative: relative.into(),
            parallel: false,
        }
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    fn output_dir(&self, root: &Path) -> PathBuf {
        match self.relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
            _ => root.to_path_buf(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub inputs: Vec<InputSource>,
    pub output_root: PathBuf,
    /// Worker threads for parallel batches; defaults to the CPU count.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Read every input fully into memory before the unit sees it.
    #[serde(default)]
    pub preload: bool,
    /// Free-form arguments handed to every unit.
    #[serde(default)]
    pub args: Vec<String>,
}

impl RunConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            output_root: output_root.into(),
            workers: None,
            preload: false,
            args: Vec::new(),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse run configuration {}", path.display()))
    }

    #[must_use]
    pub fn with_input(mut self, input: InputSource) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    #[must_use]
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn exec_mode(&self) -> ExecMode {
        match self.workers {
            Some(1) => ExecMode::Sequential,
            threads => ExecMode::Parallel { threads },
        }
    }
}

/// How parallel-tagged inputs are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel { threads: Option<usize> },
}

/// Builds units of one kind.
pub trait UnitFactory: Send + Sync {
    fn metadata(&self) -> &ProcessorMetadata;

    /// Construct the unit for one input.
    ///
    /// # Errors
    ///
    /// Construction failures count as a failed unit.
    fn create(&self, context: Arc<UnitContext>) -> Result<ProcessingUnit>;
}

/// [`UnitFactory`] backed by a closure.
pub struct FnFactory<F> {
    metadata: ProcessorMetadata,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(Arc<UnitContext>) -> Result<ProcessingUnit> + Send + Sync,
{
    pub fn new(metadata: ProcessorMetadata, build: F) -> Self {
        Self { metadata, build }
    }
}

impl<F> UnitFactory for FnFactory<F>
where
    F: Fn(Arc<UnitContext>) -> Result<ProcessingUnit> + Send + Sync,
{
    fn metadata(&self) -> &ProcessorMetadata {
        &self.metadata
    }

    fn create(&self, context: Arc<UnitContext>) -> Result<ProcessingUnit> {
        (self.build)(context)
    }
}

/// What happened to one input.
#[derive(Debug)]
pub struct UnitOutcome {
    pub input: PathBuf,
    pub artifacts: usize,
    pub elapsed: Duration,
    pub error: Option<anyhow::Error>,
}

impl UnitOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per input, in configuration order.
    pub outcomes: Vec<UnitOutcome>,
    pub bytes_committed: u64,
}

impl RunReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub struct Runner {
    pub config: RunConfig,
    storage: Arc<dyn StorageProvider>,
    logger: Arc<dyn LogSink>,
    metrics: MetricsCollector,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            storage: Arc::new(RealStorage::new()),
            logger: Arc::new(LogCrateSink),
            metrics: MetricsCollector::new(),
        }
    }

    /// Replace the real provider (the final destination of all output).
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run one unit per configured input.
    ///
    /// # Errors
    ///
    /// Only for coordinator failures (e.g. the worker pool cannot be built);
    /// unit failures are reported in the returned [`RunReport`].
    pub fn run(&self, factory: &dyn UnitFactory) -> Result<RunReport> {
        self.metrics.record_start();
        let mut report = RunReport::default();

        let serial_storage: Arc<dyn StorageProvider> = if self.config.preload {
            Arc::new(ParallelAccess::new(Arc::clone(&self.storage)))
        } else {
            Arc::clone(&self.storage)
        };

        let inputs = &self.config.inputs;
        let mut i = 0;
        while i < inputs.len() {
            if inputs[i].parallel {
                let start = i;
                while i < inputs.len() && inputs[i].parallel {
                    i += 1;
                }
                self.run_batch(factory, &inputs[start..i], &mut report)?;
            } else {
                let outcome = self.run_one(factory, &inputs[i], Arc::clone(&serial_storage));
                self.record(&outcome);
                report.outcomes.push(outcome);
                i += 1;
            }
        }

        self.metrics.record_end();
        log::info!(
            "run finished: {} succeeded, {} failed, {} bytes committed",
            report.succeeded(),
            report.failed(),
            report.bytes_committed
        );
        Ok(report)
    }

    fn run_batch(
        &self,
        factory: &dyn UnitFactory,
        batch: &[InputSource],
        report: &mut RunReport,
    ) -> Result<()> {
        let shared: Arc<dyn StorageProvider> =
            Arc::new(ParallelAccess::new(Arc::clone(&self.storage)));
        let run = |input: &InputSource| {
            let vfs = Arc::new(VirtualStorage::new(Arc::clone(&shared)));
            let outcome = self.run_one(factory, input, vfs.clone());
            (vfs, outcome)
        };

        let results: Vec<(Arc<VirtualStorage>, UnitOutcome)> = match self.config.exec_mode() {
            ExecMode::Sequential => batch.iter().map(run).collect(),
            ExecMode::Parallel { threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.unwrap_or_else(num_cpus::get))
                    .build()
                    .context("build worker pool")?;
                log::debug!(
                    "running {} unit(s) on {} worker(s)",
                    batch.len(),
                    pool.current_num_threads()
                );
                pool.install(|| batch.par_iter().map(run).collect())
            }
        };

        // Commit strictly in input order, after every unit of the batch finished.
        for (vfs, mut outcome) in results {
            if outcome.is_success() {
                match vfs.commit_to(self.storage.as_ref()) {
                    Ok(bytes) => {
                        report.bytes_committed += bytes;
                        self.metrics.increment_counter("bytes_committed", bytes);
                    }
                    Err(e) => {
                        outcome.error = Some(anyhow::Error::new(e).context(format!(
                            "commit output of {}",
                            outcome.input.display()
                        )));
                    }
                }
            } else if !vfs.is_empty() {
                log::warn!(
                    "discarding {} buffered file(s) of failed unit {}",
                    vfs.len(),
                    outcome.input.display()
                );
            }
            self.record(&outcome);
            report.outcomes.push(outcome);
        }
        Ok(())
    }

    fn run_one(
        &self,
        factory: &dyn UnitFactory,
        input: &InputSource,
        storage: Arc<dyn StorageProvider>,
    ) -> UnitOutcome {
        let path = input.path();
        let started = Instant::now();
        let context = Arc::new(
            UnitContext::new(factory.metadata().name.clone(), storage)
                .with_input(&path)
                .with_output_root(input.output_dir(&self.config.output_root))
                .with_logger(Arc::clone(&self.logger))
                .with_args(self.config.args.clone()),
        );

        let result = factory
            .create(context)
            .and_then(|mut unit| unit.drive(|ctx, artifact| artifact.write_to(ctx)));
        let elapsed = started.elapsed();

        match result {
            Ok(artifacts) => UnitOutcome {
                input: path,
                artifacts,
                elapsed,
                error: None,
            },
            Err(e) => {
                log::error!("{} failed: {e:#}", path.display());
                UnitOutcome {
                    input: path,
                    artifacts: 0,
                    elapsed,
                    error: Some(e),
                }
            }
        }
    }

    fn record(&self, outcome: &UnitOutcome) {
        let input = outcome.input.to_string_lossy();
        self.metrics.record_unit_time(&input, outcome.elapsed);
        if outcome.is_success() {
            self.metrics.increment_counter("units_succeeded", 1);
            self.metrics
                .increment_counter("artifacts_written", outcome.artifacts as u64);
        } else {
            self.metrics.increment_counter("units_failed", 1);
        }
    }
}
