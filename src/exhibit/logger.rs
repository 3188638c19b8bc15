//! Diagnostics sink for exhibit runs
//!
//! Components never talk to a global logger. They receive a
//! `&mut dyn DiagnosticSink` and emit structured diagnostics through it, so
//! binaries can forward them to `tracing` while tests collect them in memory.

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single message emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Receiver for diagnostics emitted by the reader, serializer and orchestrators
pub trait DiagnosticSink {
    /// Record one diagnostic
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Severity shorthands, usable on any `&mut dyn DiagnosticSink`
impl dyn DiagnosticSink + '_ {
    pub fn info(&mut self, message: impl Into<String>) {
        self.emit(Diagnostic {
            severity: Severity::Info,
            message: message.into(),
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.emit(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.emit(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        });
    }
}

/// Forwards diagnostics to the `tracing` macros
///
/// Filtering (e.g. `--quiet`) is left to the installed subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::info!("{}", diagnostic.message),
            Severity::Warning => tracing::warn!("{}", diagnostic.message),
            Severity::Error => tracing::error!("{}", diagnostic.message),
        }
    }
}

/// Collects diagnostics in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub diagnostics: Vec<Diagnostic>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages with the given severity, in emission order
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }

    /// Whether any message at `severity` contains `needle`
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.messages(severity).iter().any(|m| m.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
