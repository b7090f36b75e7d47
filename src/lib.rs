//! # Binmill
//!
//! A framework for writing binary file transformations ("processing units") and
//! running them over many inputs, possibly in parallel, without filesystem races
//! and without out-of-bounds binary access.
//!
//! ## Key Features
//!
//! - **Bounds-checked parsing** - [`BinaryCursor`] over a fixed region, with
//!   end-of-data on reads and I/O faults on writes kept apart
//! - **One stream contract, many backings** - [`BoundedStream`] over owned or
//!   borrowed memory, foreign memory, a window of another stream, a growable
//!   buffer, or a file
//! - **Virtualized storage** - [`VirtualStorage`] buffers every write in memory
//!   so parallel units never touch disk until the batch is committed
//! - **Two execution strategies** - Direct (one action, at most once) and
//!   Segmented (lazy, pull-based artifact production)
//! - **Ambient unit context** - helper code finds "the unit running on this
//!   thread" through [`unit::context`]
//! - **Batch runner** - run a [`UnitFactory`] over a list of inputs on a rayon
//!   pool (feature: `runner`)
//!
//! ## Quick Start
//!
//! ```
//! use binmill::cursor::BinaryCursor;
//! use binmill::storage::{RealStorage, VirtualStorage};
//! use binmill::unit::{context, ProcessingUnit, UnitContext};
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let storage = Arc::new(VirtualStorage::new(Arc::new(RealStorage::new())));
//! let ctx = Arc::new(UnitContext::new("header", storage.clone()).with_output_root("out"));
//!
//! let mut unit = ProcessingUnit::direct(ctx, |_ctx| {
//!     let mut header = [0u8; 8];
//!     let mut cur = BinaryCursor::new(&mut header);
//!     cur.write_u32_le(0x4D42_4C4E)?;
//!     cur.write_u32_le(1)?;
//!     // helpers reach the running unit without it being passed in
//!     context::open_output("header.bin")?.write_all(&header)?;
//!     Ok(())
//! });
//! unit.drive(|_, _| Ok(()))?;
//!
//! let files = storage.files();
//! assert_eq!(files.len(), 1);
//! assert_eq!(files[0].length, 8);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`cursor`] - `BinaryCursor`
//! - [`stream`] - the bounded stream family
//! - [`storage`] - real, parallel-access and virtual storage providers
//! - [`unit`] - processing units, strategies and the current-unit context
//! - [`runner`] - batch coordinator (feature: `runner`)
//! - [`codec`] - hex decoding, depadding, offset formatting
//! - [`metadata`] - processor descriptions
//! - [`logging`] - the log sink handed to units
//! - [`metrics`] - run counters and timings
//! - [`testing`] - helpers for tests

pub mod codec;
pub mod cursor;
pub mod error;
pub mod logging;
pub mod metadata;
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg_attr(docsrs, doc(cfg(feature = "runner")))]
#[cfg(feature = "runner")]
pub mod runner;
pub mod storage;
pub mod stream;
pub mod testing;
pub mod unit;

// General re-exports
pub use cursor::BinaryCursor;
pub use error::{Error, ErrorKind, Result};
pub use logging::LogSink;
pub use metadata::ProcessorMetadata;
pub use storage::{OpenMode, ParallelAccess, RealStorage, StorageProvider, VirtualStorage};
pub use stream::{BoundedStream, MemoryStream, RawMemoryStream, WindowStream};
pub use unit::{Artifact, ProcessingUnit, Strategy, UnitContext};

// Gated re-exports
#[cfg(feature = "runner")]
pub use runner::{InputSource, RunConfig, RunReport, Runner, UnitFactory};
