// Semantic analysis for Orcinus
//
// Lowers parsed modules into a typed symbol graph. Analysis of a module
// runs in four passes (scope annotation, symbol import, symbol
// declaration, body emission) and is reentrant across modules: imports
// pull other modules through the workspace, and models are memoized by
// document uri so cyclic imports see the partially-constructed module.

pub mod analyze;
pub mod dump;
pub mod infer;
pub mod instantiate;
pub mod mangle;
pub mod scope;
pub mod symbol;
pub mod types;
pub mod value;

pub use dump::dump_module;
pub use infer::{Concrete, InferError, Inference};
pub use instantiate::{InstantiateError, Instantiator};
pub use mangle::Mangler;
pub use scope::{Binding, Overload, ScopeId, Scopes};
pub use symbol::{
    FieldId, FuncId, GenericRef, MemberId, ModuleId, Owner, ParamId, SymbolTable, TypeId, VarId,
};
pub use types::{TypeData, TypeKind};
pub use value::{Attribute, Statement, Value};

use crate::cst::{NodeId, SyntaxTree};
use crate::diagnostic::{DiagnosticSink, Diagnostics};
use crate::parser;
use crate::source::{Location, SourceMap};
use crate::workspace::{Document, Workspace, WorkspaceError, BUILTINS_MODULE};
use analyze::ModuleAnalyzer;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// What a CST node declared or resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    Module(ModuleId),
    Type(TypeId),
    Function(FuncId),
    Field(FieldId),
    Parameter(ParamId),
}

/// The analyzed model of one document
pub struct SemanticModel {
    pub uri: String,
    pub name: String,
    pub source: String,
    pub tree: Rc<SyntaxTree>,
    /// The typed module, root of the symbol graph
    pub module: ModuleId,
    /// Scope of every CST node
    pub node_scopes: HashMap<NodeId, ScopeId>,
    /// Symbols declared by CST nodes
    pub node_symbols: HashMap<NodeId, Declared>,
}

#[derive(Debug, Default, Clone, Copy)]
struct BuiltinCache {
    int_type: Option<TypeId>,
    bool_type: Option<TypeId>,
    void_type: Option<TypeId>,
    str_type: Option<TypeId>,
}

/// Analysis session over a workspace
///
/// Owns the scope and symbol arenas, the diagnostics, and all analyzed
/// models. `open` is the entry point; `load` resolves a module by name.
pub struct SemanticContext<W: Workspace> {
    workspace: W,
    pub diagnostics: Diagnostics,
    pub(crate) symbols: SymbolTable,
    pub(crate) scopes: Scopes,
    models: IndexMap<String, SemanticModel>,
    name_to_uri: HashMap<String, String>,
    builtins: BuiltinCache,
}

impl<W: Workspace> SemanticContext<W> {
    pub fn new(workspace: W) -> Self {
        Self {
            workspace,
            diagnostics: Diagnostics::new(),
            symbols: SymbolTable::new(),
            scopes: Scopes::new(),
            models: IndexMap::new(),
            name_to_uri: HashMap::new(),
            builtins: BuiltinCache::default(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn model(&self, uri: &str) -> Option<&SemanticModel> {
        self.models.get(uri)
    }

    pub fn models(&self) -> impl Iterator<Item = &SemanticModel> {
        self.models.values()
    }

    /// Move all collected diagnostics into a sink
    pub fn drain_diagnostics_into(&mut self, sink: &mut dyn DiagnosticSink) {
        self.diagnostics.drain_into(sink);
    }

    /// Sources of every analyzed document, for diagnostic rendering
    pub fn source_map(&self) -> SourceMap {
        let mut sources = SourceMap::new();
        for model in self.models() {
            sources.insert(model.uri.clone(), model.source.clone());
        }
        sources
    }

    /// Open a document: parse it, analyze it, and return its module.
    /// Repeated opens of the same uri return the memoized model.
    pub fn open(&mut self, document: &Document) -> ModuleId {
        if let Some(model) = self.models.get(&document.uri) {
            return model.module;
        }
        tracing::debug!(uri = %document.uri, name = %document.name, "analyzing module");

        let result = parser::parse(&document.uri, &document.source);
        self.diagnostics.merge(result.diagnostics);
        let tree = Rc::new(result.tree);

        let container_scope = self.scopes.create(None);
        let location = tree.location(tree.root()).clone();
        let module = self
            .symbols
            .alloc_module(&document.name, location, container_scope);

        // The model is registered before analysis so cyclic imports
        // observe the partially-constructed module instead of recursing.
        self.models.insert(
            document.uri.clone(),
            SemanticModel {
                uri: document.uri.clone(),
                name: document.name.clone(),
                source: document.source.clone(),
                tree: Rc::clone(&tree),
                module,
                node_scopes: HashMap::new(),
                node_symbols: HashMap::new(),
            },
        );

        let analyzer = ModuleAnalyzer::new(self, Rc::clone(&tree), module, &document.name);
        let (node_scopes, node_symbols, outcome) = analyzer.analyze();
        if let Err(error) = outcome {
            let location = self.symbols.module(module).location.clone();
            self.diagnostics.error(error.to_string(), location);
        }

        let model = self
            .models
            .get_mut(&document.uri)
            .expect("model registered above");
        model.node_scopes = node_scopes;
        model.node_symbols = node_symbols;
        module
    }

    /// Load and analyze a module by name through the workspace
    pub fn load(&mut self, module_name: &str) -> Result<ModuleId, WorkspaceError> {
        if let Some(uri) = self.name_to_uri.get(module_name) {
            if let Some(model) = self.models.get(uri) {
                return Ok(model.module);
            }
        }
        let document = self.workspace.load_document(module_name)?;
        self.name_to_uri
            .insert(module_name.to_string(), document.uri.clone());
        Ok(self.open(&document))
    }

    // --- Built-in types ---
    //
    // Resolved lazily and independently: while `__builtins__` itself is
    // being analyzed, `int` must already be resolvable before `str` has
    // been declared.

    pub fn integer_type(&mut self) -> TypeId {
        if let Some(ty) = self.builtins.int_type {
            return ty;
        }
        let ty = self.builtin_named("int");
        self.builtins.int_type = Some(ty);
        ty
    }

    pub fn boolean_type(&mut self) -> TypeId {
        if let Some(ty) = self.builtins.bool_type {
            return ty;
        }
        let ty = self.builtin_named("bool");
        self.builtins.bool_type = Some(ty);
        ty
    }

    pub fn void_type(&mut self) -> TypeId {
        if let Some(ty) = self.builtins.void_type {
            return ty;
        }
        let ty = self.builtin_named("void");
        self.builtins.void_type = Some(ty);
        ty
    }

    pub fn string_type(&mut self) -> TypeId {
        if let Some(ty) = self.builtins.str_type {
            return ty;
        }
        let ty = self.builtin_named("str");
        self.builtins.str_type = Some(ty);
        ty
    }

    fn builtin_named(&mut self, name: &str) -> TypeId {
        match self.load(BUILTINS_MODULE) {
            Ok(module) => {
                let scope = self.symbols.module(module).scope;
                match self.scopes.resolve(scope, name) {
                    Some(Binding::Type(ty)) => ty,
                    _ => {
                        self.diagnostics.error(
                            format!("built-in module does not define '{}'", name),
                            Location::default(),
                        );
                        self.error_type(Location::default())
                    }
                }
            }
            Err(error) => {
                self.diagnostics.error(
                    format!("cannot load built-in module: {}", error),
                    Location::default(),
                );
                self.error_type(Location::default())
            }
        }
    }

    /// Allocate a fresh poison type; never equal to any other type
    pub fn error_type(&mut self, location: Location) -> TypeId {
        let scope = self.scopes.create(None);
        // Poison is owned by whichever module triggered it; module 0 is a
        // safe fallback for failures before any module exists.
        let owner = if self.symbols.modules.is_empty() {
            let scope = self.scopes.create(None);
            Owner::Module(self.symbols.alloc_module("<error>", location.clone(), scope))
        } else {
            Owner::Module(ModuleId(0))
        };
        self.symbols.alloc_type(TypeData::primitive(
            TypeKind::Error,
            owner,
            "<error>",
            location,
            scope,
        ))
    }

    /// Allocate a poison value carrying a fresh poison type
    pub fn error_value(&mut self, location: Location) -> Value {
        let ty = self.error_type(location.clone());
        Value::Error { ty, location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryWorkspace;

    #[test]
    fn test_open_is_memoized() {
        let workspace = MemoryWorkspace::new().with_module("app", "def f() -> void: ...\n");
        let mut ctx = SemanticContext::new(workspace);
        let first = ctx.load("app").unwrap();
        let second = ctx.load("app").unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.models().count(), 1);
    }

    #[test]
    fn test_builtin_types_resolve() {
        let mut ctx = SemanticContext::new(MemoryWorkspace::new());
        let int_ty = ctx.integer_type();
        let bool_ty = ctx.boolean_type();
        let void_ty = ctx.void_type();
        let str_ty = ctx.string_type();

        assert!(matches!(ctx.symbols().ty(int_ty).kind, TypeKind::Int));
        assert!(matches!(ctx.symbols().ty(bool_ty).kind, TypeKind::Bool));
        assert!(matches!(ctx.symbols().ty(void_ty).kind, TypeKind::Void));
        assert!(matches!(ctx.symbols().ty(str_ty).kind, TypeKind::Str));
        assert!(
            !ctx.diagnostics.has_errors(),
            "builtins must analyze cleanly: {:?}",
            ctx.diagnostics.as_slice()
        );

        // Lazy lookups are cached
        assert_eq!(int_ty, ctx.integer_type());
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let workspace = MemoryWorkspace::new()
            .with_module("a", "from b import g\ndef f() -> void: ...\n")
            .with_module("b", "from a import f\ndef g() -> void: ...\n");
        let mut ctx = SemanticContext::new(workspace);
        let module = ctx.load("a").unwrap();
        // The cycle terminates; `a` sees `b` fully and `b` sees a partial
        // `a`, which reports an unresolved import.
        assert_eq!(ctx.symbols().module(module).name, "a");
    }

    #[test]
    fn test_missing_module_error() {
        let mut ctx = SemanticContext::new(MemoryWorkspace::new());
        assert!(matches!(
            ctx.load("nope"),
            Err(WorkspaceError::ModuleNotFound(_))
        ));
    }
}
