//! Leveled logging handle passed explicitly through the core.
//!
//! The core never reaches for global logger state: every entry point that can
//! report diagnostics takes a [`Logger`]. [`TracingLogger`] forwards to the
//! `tracing` ecosystem for the CLI, and [`MemoryLogger`] records messages for
//! tests and embedding applications.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// The level of a log message, ordered from most to least severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LogLevel {
    /// A failure that aborts the current operation.
    Error,
    /// A degraded condition the operation recovered from.
    Warning,
    /// Normal progress output (files written, passes started).
    Info,
    /// Detail useful when diagnosing configuration problems.
    Debug,
    /// Very chatty per-file detail.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// A leveled sink for diagnostic messages.
///
/// Implementors only provide [`log`](Self::log); the per-level helpers are
/// convenience wrappers.
pub trait Logger: Send + Sync {
    /// Records one message at the given level.
    fn log(&self, level: LogLevel, message: &str);

    /// Logs at [`LogLevel::Error`].
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Logs at [`LogLevel::Warning`].
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    /// Logs at [`LogLevel::Info`].
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Logs at [`LogLevel::Debug`].
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs at [`LogLevel::Trace`].
    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }
}

/// Forwards every message to the matching `tracing` macro.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Trace => tracing::trace!("{message}"),
        }
    }
}

/// A thread-safe in-memory accumulator of log records.
pub struct MemoryLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all records without draining.
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes all records, leaving the logger empty.
    pub fn take_all(&self) -> Vec<(LogLevel, String)> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *records)
    }

    /// Returns the number of records logged at exactly `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    /// Returns `true` if some record at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
