// Orcinus Compiler Core Library
//
// The compiler front-end for the Orcinus language:
// - Hand-written indentation-aware scanner
// - Recursive descent parser producing a lossless CST with error recovery
// - Semantic analyzer lowering the CST to a typed symbol graph: lexical
//   scopes, overload resolution, Hindley-Milner inference at call sites,
//   and on-demand monomorphization of generic symbols
// - Stable external name mangling
// - Diagnostic system with structured, location-carrying messages
//
// Code generation, incremental re-analysis, and execution are out of
// scope; the typed module produced here is the hand-off point.

pub mod cst;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod source;
pub mod workspace;

pub use diagnostic::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use parser::ParseResult;
pub use source::{LineCol, Location, SourceMap, Span};
pub use workspace::{Document, FileWorkspace, MemoryWorkspace, Workspace};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a source file into a lossless CST with diagnostics
pub fn parse_source(filename: &str, source: &str) -> ParseResult {
    parser::parse(filename, source)
}

/// Analyze a document against a workspace and return the session together
/// with the typed module
pub fn analyze_document<W: Workspace>(
    workspace: W,
    document: &Document,
) -> (semantic::SemanticContext<W>, semantic::ModuleId) {
    let mut context = semantic::SemanticContext::new(workspace);
    let module = context.open(document);
    (context, module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let result = parse_source("test.orx", "def f(x: int) -> int:\n    return x\n");
        assert!(!result.diagnostics.has_errors());
    }

    #[test]
    fn test_analyze_document() {
        let document = Document::new(
            "memory:app",
            "app",
            "def f(x: int) -> int:\n    return x + 1\n",
        );
        let (ctx, module) = analyze_document(MemoryWorkspace::new(), &document);
        assert!(
            !ctx.diagnostics.has_errors(),
            "{:?}",
            ctx.diagnostics.as_slice()
        );
        assert_eq!(ctx.symbols().module(module).name, "app");
        assert!(!ctx.symbols().module(module).functions.is_empty());
    }

    #[test]
    fn test_analysis_reports_semantic_errors() {
        let document = Document::new("memory:app", "app", "def f() -> int:\n    return nope\n");
        let (ctx, _) = analyze_document(MemoryWorkspace::new(), &document);
        assert!(ctx.diagnostics.has_errors());
    }
}
