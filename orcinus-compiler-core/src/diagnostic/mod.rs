// Diagnostic system for the Orcinus compiler
//
// This module provides structured, machine-readable diagnostics with:
// - Multiple severity levels
// - Precise source locations (file + byte span)
// - Related information for cross-file references
// - JSON serialization for tooling consumption
// - Output-agnostic design via the DiagnosticSink trait

pub mod format;
pub mod sink;

use crate::source::Location;
use serde::{Deserialize, Serialize};

pub use format::{format_diagnostic, format_diagnostic_colored};
pub use sink::{CountingSink, DiagnosticSink, NullSink};

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Related information pointing to another location
///
/// Used for "defined here", "previous occurrence", etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub location: Location,
    pub message: String,
}

impl RelatedInfo {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// A single diagnostic message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location,
            help: None,
            related: Vec::new(),
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
            help: None,
            related: Vec::new(),
        }
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add related information
    pub fn with_related(mut self, related: RelatedInfo) -> Self {
        self.related.push(related);
        self
    }
}

/// Collection of diagnostics accumulated during compilation
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add an error
    pub fn error(&mut self, message: impl Into<String>, location: Location) {
        self.add(Diagnostic::error(message, location));
    }

    /// Add a warning
    pub fn warning(&mut self, message: impl Into<String>, location: Location) {
        self.add(Diagnostic::warning(message, location));
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Get the total number of diagnostics
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Get all diagnostics
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Get diagnostics as a slice
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Merge another diagnostics collection into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Drain all diagnostics into a sink
    pub fn drain_into(&mut self, sink: &mut dyn DiagnosticSink) {
        for diagnostic in self.diagnostics.drain(..) {
            sink.emit(diagnostic);
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            diagnostics: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    fn loc(start: u32, end: u32) -> Location {
        Location::new("test.orx", Span::new(start, end))
    }

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::error("unexpected token", loc(10, 15))
            .with_help("did you forget a newline?")
            .with_related(RelatedInfo::new(loc(5, 10), "previous token here"));

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "unexpected token");
        assert_eq!(diag.related.len(), 1);
        assert!(diag.help.is_some());
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.error("error 1", loc(0, 5));
        diags.warning("warning 1", loc(10, 15));
        diags.error("error 2", loc(20, 25));

        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn test_json_output() {
        let mut diags = Diagnostics::new();
        diags.add(Diagnostic::error("test error", loc(0, 5)).with_help("fix it"));

        let json = diags.to_json();
        assert!(json.contains("test error"));
        assert!(json.contains("fix it"));
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut diags1 = Diagnostics::new();
        diags1.error("error 1", loc(0, 5));

        let mut diags2 = Diagnostics::new();
        diags2.warning("warning 1", loc(10, 15));

        diags1.merge(diags2);
        assert_eq!(diags1.len(), 2);
    }
}
