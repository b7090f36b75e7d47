//! Logging sink handed to processing units.
//!
//! The crate itself logs through the [`log`] facade. Units get an explicit
//! [`LogSink`] so a coordinator can route per-unit messages wherever it likes.

use log::Level;

/// Destination for unit log messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    /// Whether messages at `level` would be kept. Lets callers skip formatting.
    fn enabled(&self, level: Level) -> bool;
}

/// Forwards to the global [`log`] logger under the `binmill::unit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "binmill::unit", level, "{message}");
    }

    fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: "binmill::unit", level)
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}
