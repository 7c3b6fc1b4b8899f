// Source location tracking for the Orcinus compiler
//
// Semantic analysis routinely crosses module (and therefore file)
// boundaries, so a bare byte range is not enough to point at source: every
// token, syntax node, diagnostic, and symbol carries a `Location` that
// names its file. `Span` is only the raw byte range inside one file;
// combining ranges and mapping them to human-readable positions are
// file-aware operations and live on `Location` and `SourceMap`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A half-open byte range inside a single source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: u32,
    /// End byte offset (exclusive)
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes; inverted ranges count as empty
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A byte range in a named source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Name of the source file (or pseudo-file, e.g. a module uri)
    pub file: String,
    /// Byte range inside the file
    pub span: Span,
}

impl Location {
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }

    /// Zero-width location at a byte offset (for insertion points and
    /// synthesized tokens)
    pub fn point(file: impl Into<String>, pos: u32) -> Self {
        Self::new(file, Span::new(pos, pos))
    }

    /// Location covering this one and another.
    ///
    /// Ranges from different files do not combine; the receiver is the
    /// anchor and wins, so merging a real location with a default or
    /// foreign one degrades to the anchor instead of producing a range
    /// that points nowhere.
    pub fn merge(&self, other: &Location) -> Location {
        if self.file != other.file {
            return self.clone();
        }
        Location {
            file: self.file.clone(),
            span: Span::new(
                self.span.start.min(other.span.start),
                self.span.end.max(other.span.end),
            ),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}..{}", self.file, self.span.start, self.span.end)
    }
}

/// Line and column information for human-readable error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number, counted in characters
    pub col: u32,
}

/// Sources of every analyzed file, keyed by file name
///
/// Diagnostics carry locations into files the current caller never opened
/// itself (imported modules, the bundled builtins), so rendering needs the
/// whole map, not a single source string. Lookups walk the line structure
/// on demand; diagnostics are rare enough that no per-file index is kept.
#[derive(Debug, Default)]
pub struct SourceMap {
    sources: IndexMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a file's source text
    pub fn insert(&mut self, file: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(file.into(), source.into());
    }

    /// The source text of a file, if known
    pub fn source(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(|s| s.as_str())
    }

    /// Map a location to its line/column position
    pub fn position(&self, location: &Location) -> Option<LineCol> {
        let text = self.source(&location.file)?;
        let offset = (location.span.start as usize).min(text.len());
        let prefix = text.get(..offset)?;

        let mut position = LineCol { line: 1, col: 1 };
        for ch in prefix.chars() {
            if ch == '\n' {
                position.line += 1;
                position.col = 1;
            } else {
                position.col += 1;
            }
        }
        Some(position)
    }

    /// The full text of the line a location starts on
    pub fn line_of(&self, location: &Location) -> Option<&str> {
        let line = self.position(location)?.line;
        self.source(&location.file)?.lines().nth(line as usize - 1)
    }
}
