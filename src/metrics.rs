//! Counters and timings collected while a batch runs.
//!
//! The [`Runner`](crate::runner::Runner) records these counters:
//!
//! - `units_succeeded` / `units_failed`
//! - `artifacts_written` - artifacts consumed from segmented units
//! - `bytes_committed` - bytes flushed from virtual storage to the real provider
//!
//! plus the wall time of every unit and of the whole run.
//!
//! ```
//! use binmill::metrics::MetricsCollector;
//!
//! let metrics = MetricsCollector::new();
//! metrics.increment_counter("units_succeeded", 2);
//! assert_eq!(metrics.counter("units_succeeded"), 2);
//! assert_eq!(metrics.to_json()["counters"]["units_succeeded"], 2);
//! ```

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Thread-safe, cloneable metrics sink for one run.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    counters: BTreeMap<String, u64>,
    unit_times: BTreeMap<String, Duration>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&self) {
        self.lock().start_time = Some(Instant::now());
    }

    pub fn record_end(&self) {
        self.lock().end_time = Some(Instant::now());
    }

    /// Run wall time, once both ends were recorded.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.lock();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Add `value` to the counter `name`, creating it at zero if missing.
    pub fn increment_counter(&self, name: &str, value: u64) {
        *self.lock().counters.entry(name.to_string()).or_insert(0) += value;
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Record how long the unit for `input` took.
    pub fn record_unit_time(&self, input: &str, elapsed: Duration) {
        self.lock().unit_times.insert(input.to_string(), elapsed);
    }

    #[must_use]
    pub fn unit_time(&self, input: &str) -> Option<Duration> {
        self.lock().unit_times.get(input).copied()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.lock();
        let units: serde_json::Map<String, Value> = inner
            .unit_times
            .iter()
            .map(|(k, d)| (k.clone(), json!(d.as_millis() as u64)))
            .collect();
        let mut out = json!({
            "counters": inner.counters,
            "unit_time_ms": units,
        });
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            out["execution_time_ms"] = json!(end.duration_since(start).as_millis() as u64);
        }
        out
    }

    /// Write [`to_json`](Self::to_json) to `path`, pretty-printed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().expect("metrics mutex poisoned")
    }
}
