//! Leveled diagnostics emitted by selection, application and merging.
//!
//! Every component takes a [`DiagnosticSink`] explicitly. The binary wires in
//! [`TracingSink`]; tests use [`RecordingSink`] to assert on the exact
//! sequence of messages.

use std::fmt;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Trace => "trace",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(label)
    }
}

/// Destination for leveled diagnostic messages.
pub trait DiagnosticSink {
    fn emit(&mut self, level: Level, message: &str);

    fn trace(&mut self, message: &str) {
        self.emit(Level::Trace, message);
    }

    fn info(&mut self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Level::Error, message);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, level: Level, message: &str) {
        (**self).emit(level, message);
    }
}

/// Forwards diagnostics to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, level: Level, message: &str) {
        match level {
            Level::Trace => tracing::trace!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
    }
}

/// Collects diagnostics in emission order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSink {
    pub records: Vec<(Level, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages emitted at exactly `level`, in order.
    pub fn messages_at(&self, level: Level) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, level: Level, message: &str) {
        self.records.push((level, message.to_string()));
    }
}
