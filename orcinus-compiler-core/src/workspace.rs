// Workspace abstraction for Orcinus
//
// The semantic analyzer pulls imported modules through a `Workspace`;
// memoization lives in `SemanticContext` (models keyed by uri), so cyclic
// imports resolve to the partially-constructed model instead of recursing
// forever. Two implementations are provided: a filesystem workspace rooted
// at a directory, and an in-memory workspace for tests and embedding.

use indexmap::IndexMap;
use std::path::PathBuf;
use thiserror::Error;

/// Name of the intrinsic module every program can import from
pub const BUILTINS_MODULE: &str = "__builtins__";

/// Bundled source of the intrinsic module
pub const BUILTINS_SOURCE: &str = include_str!("builtins.orx");

/// Failure to load a module's document
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded source document
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identity of the document (file path or pseudo-uri)
    pub uri: String,
    /// Module name the document defines
    pub name: String,
    pub source: String,
}

impl Document {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            source: source.into(),
        }
    }

    /// The bundled `__builtins__` document
    pub fn builtins() -> Self {
        Self::new(
            format!("builtins:{}", BUILTINS_MODULE),
            BUILTINS_MODULE,
            BUILTINS_SOURCE,
        )
    }
}

/// Source of module documents for the analyzer
pub trait Workspace {
    fn load_document(&self, module_name: &str) -> Result<Document, WorkspaceError>;
}

/// Loads `<root>/<module>.orx`; falls back to the bundled source for
/// `__builtins__` when no file overrides it
pub struct FileWorkspace {
    root: PathBuf,
}

impl FileWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Workspace for FileWorkspace {
    fn load_document(&self, module_name: &str) -> Result<Document, WorkspaceError> {
        let path = self.root.join(format!("{}.orx", module_name));
        if !path.exists() {
            if module_name == BUILTINS_MODULE {
                return Ok(Document::builtins());
            }
            return Err(WorkspaceError::ModuleNotFound(module_name.to_string()));
        }
        let source = std::fs::read_to_string(&path).map_err(|source| WorkspaceError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Document::new(
            path.to_string_lossy().into_owned(),
            module_name,
            source,
        ))
    }
}

/// In-memory workspace; ships the bundled builtins by default
#[derive(Default)]
pub struct MemoryWorkspace {
    documents: IndexMap<String, String>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module_name: impl Into<String>, source: impl Into<String>) {
        self.documents.insert(module_name.into(), source.into());
    }

    pub fn with_module(mut self, module_name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(module_name, source);
        self
    }
}

impl Workspace for MemoryWorkspace {
    fn load_document(&self, module_name: &str) -> Result<Document, WorkspaceError> {
        if let Some(source) = self.documents.get(module_name) {
            return Ok(Document::new(
                format!("memory:{}", module_name),
                module_name,
                source.clone(),
            ));
        }
        if module_name == BUILTINS_MODULE {
            return Ok(Document::builtins());
        }
        Err(WorkspaceError::ModuleNotFound(module_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_workspace() {
        let workspace = MemoryWorkspace::new().with_module("app", "pass\n");
        let doc = workspace.load_document("app").unwrap();
        assert_eq!(doc.name, "app");
        assert_eq!(doc.source, "pass\n");

        assert!(matches!(
            workspace.load_document("missing"),
            Err(WorkspaceError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_builtins_always_available() {
        let workspace = MemoryWorkspace::new();
        let doc = workspace.load_document(BUILTINS_MODULE).unwrap();
        assert!(doc.source.contains("struct int"));
    }

    #[test]
    fn test_builtins_parses_cleanly() {
        let result = crate::parser::parse("builtins:__builtins__", BUILTINS_SOURCE);
        assert!(
            !result.diagnostics.has_errors(),
            "bundled builtins must parse: {:?}",
            result.diagnostics.as_slice()
        );
    }
}
