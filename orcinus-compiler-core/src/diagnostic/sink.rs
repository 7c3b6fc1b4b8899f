// Diagnostic sink abstraction for output-agnostic diagnostic collection
//
// The DiagnosticSink trait decouples diagnostic emission from consumption:
// batch collection for the CLI, counting for quick validation passes, or
// discarding when only the presence of errors matters.

use super::{Diagnostic, Diagnostics, Severity};

/// A sink that receives diagnostics during compilation
pub trait DiagnosticSink {
    /// Emit a diagnostic to the sink
    fn emit(&mut self, diagnostic: Diagnostic);

    /// Check if any errors have been emitted
    fn has_errors(&self) -> bool;

    /// Get the count of errors emitted
    fn error_count(&self) -> usize;
}

/// The default batch sink: a `Diagnostics` collection is itself a sink.
impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.add(diagnostic);
    }

    fn has_errors(&self) -> bool {
        Diagnostics::has_errors(self)
    }

    fn error_count(&self) -> usize {
        Diagnostics::error_count(self)
    }
}

/// A sink that counts diagnostics by severity without storing them
#[derive(Debug, Default)]
pub struct CountingSink {
    error_count: usize,
    warning_count: usize,
    info_count: usize,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn total_count(&self) -> usize {
        self.error_count + self.warning_count + self.info_count
    }
}

impl DiagnosticSink for CountingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => self.info_count += 1,
        }
    }

    fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    fn error_count(&self) -> usize {
        self.error_count
    }
}

/// A sink that discards all diagnostics
#[derive(Debug, Default)]
pub struct NullSink {
    error_count: usize,
}

impl NullSink {
    pub fn new() -> Self {
        Self { error_count: 0 }
    }
}

impl DiagnosticSink for NullSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
    }

    fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    fn error_count(&self) -> usize {
        self.error_count
    }
}
