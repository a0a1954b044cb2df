//! Advisory diagnostics for compile and emit passes.
//!
//! Nothing here changes the output. Every entry is also forwarded to the
//! `log` facade, so callers that don't care about the collected list still
//! see the messages in their logger.

use serde::Serialize;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something was dropped from the output.
    Warning,
    /// A default or fallback was applied; output is complete.
    Info,
}

/// A single advisory message about one statement or element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Identifier of the statement or element the message refers to
    /// (empty when it could not be determined).
    pub subject: String,
    /// Human-readable message.
    pub message: String,
    pub severity: Severity,
}

/// Collects diagnostics in emission order.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning: the subject was skipped.
    pub fn warn(&mut self, subject: &str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{subject}: {message}");
        self.entries.push(Diagnostic {
            subject: subject.to_string(),
            message,
            severity: Severity::Warning,
        });
    }

    /// Record an informational note: a fallback was used.
    pub fn info(&mut self, subject: &str, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{subject}: {message}");
        self.entries.push(Diagnostic {
            subject: subject.to_string(),
            message,
            severity: Severity::Info,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Only the entries that dropped something.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
