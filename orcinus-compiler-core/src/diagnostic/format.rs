// Terminal formatting for diagnostics
//
// Renders a diagnostic with file:line:col, the offending source line, and
// a caret underline. Diagnostics point into any of the analyzed files
// (imported modules included), so rendering resolves positions through a
// `SourceMap`; locations into unknown files fall back to byte offsets.

use super::{Diagnostic, Severity};
use crate::source::SourceMap;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Format a diagnostic without colors
pub fn format_diagnostic(diagnostic: &Diagnostic, sources: &SourceMap) -> String {
    render(diagnostic, sources, false)
}

/// Format a diagnostic with ANSI colors
pub fn format_diagnostic_colored(diagnostic: &Diagnostic, sources: &SourceMap) -> String {
    render(diagnostic, sources, true)
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}

fn render(diagnostic: &Diagnostic, sources: &SourceMap, colored: bool) -> String {
    let mut out = String::new();
    let location = &diagnostic.location;

    let (color, reset, bold) = if colored {
        (severity_color(diagnostic.severity), RESET, BOLD)
    } else {
        ("", "", "")
    };

    match sources.position(location) {
        Some(position) => {
            out.push_str(&format!(
                "{bold}{}:{}:{}{reset}: {color}{}{reset}: {}\n",
                location.file,
                position.line,
                position.col,
                diagnostic.severity.as_str(),
                diagnostic.message,
            ));
            if let Some(line) = sources.line_of(location) {
                let width = (location.span.len() as usize).clamp(1, line.len() + 1);
                out.push_str(&format!("    {}\n", line));
                out.push_str(&format!(
                    "    {}{color}{}{reset}\n",
                    " ".repeat(position.col as usize - 1),
                    "^".repeat(width),
                ));
            }
        }
        None => {
            out.push_str(&format!(
                "{bold}{}{reset}: {color}{}{reset}: {}\n",
                location,
                diagnostic.severity.as_str(),
                diagnostic.message,
            ));
        }
    }

    if let Some(help) = &diagnostic.help {
        out.push_str(&format!("    help: {}\n", help));
    }
    for related in &diagnostic.related {
        out.push_str(&format!("    note: {}: {}\n", related.location, related.message));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Location, Span};

    #[test]
    fn test_format_with_source() {
        let mut sources = SourceMap::new();
        sources.insert("test.orx", "def f():\n    return x\n");

        let diag = Diagnostic::error(
            "cannot find symbol 'x'",
            Location::new("test.orx", Span::new(20, 21)),
        );
        let text = format_diagnostic(&diag, &sources);
        assert!(text.contains("test.orx:2:9"));
        assert!(text.contains("return x"));
        assert!(text.contains('^'));
    }

    #[test]
    fn test_format_unknown_file_falls_back_to_offsets() {
        let sources = SourceMap::new();
        let diag = Diagnostic::error(
            "something failed",
            Location::new("lib.orx", Span::new(3, 7)),
        );
        let text = format_diagnostic(&diag, &sources);
        assert!(text.contains("lib.orx:3..7"));
        assert!(text.contains("something failed"));
    }

    #[test]
    fn test_format_picks_the_right_file() {
        let mut sources = SourceMap::new();
        sources.insert("a.orx", "aaaa\n");
        sources.insert("b.orx", "bbbb\n");

        let diag = Diagnostic::warning("look here", Location::new("b.orx", Span::new(0, 4)));
        let text = format_diagnostic(&diag, &sources);
        assert!(text.contains("b.orx:1:1"));
        assert!(text.contains("bbbb"));
        assert!(!text.contains("aaaa"));
    }
}
