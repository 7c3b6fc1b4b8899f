// Lexical scopes for Orcinus semantic analysis
//
// Scopes form a tree addressed by `ScopeId`; each scope owns the names
// defined directly in it plus a cache of resolutions. Name resolution walks
// the parent chain, and overload sets merge across scope levels: a local
// overload shadows but does not hide the functions of an enclosing one.

use super::symbol::{FieldId, FuncId, ModuleId, ParamId, TypeId, VarId};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// A name-keyed set of candidate functions used during call resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overload {
    pub name: String,
    pub functions: Vec<FuncId>,
}

impl Overload {
    pub fn new(name: impl Into<String>, function: FuncId) -> Self {
        Self {
            name: name.into(),
            functions: vec![function],
        }
    }

    pub fn append(&mut self, function: FuncId) {
        if !self.functions.contains(&function) {
            self.functions.push(function);
        }
    }

    pub fn extend(&mut self, other: &Overload) {
        for &function in &other.functions {
            self.append(function);
        }
    }
}

/// What a name is bound to in a scope
///
/// A binding either is an overload (open set of functions) or a single
/// symbol; redefining a name with a non-function is a duplicate definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Module(ModuleId),
    Type(TypeId),
    Overload(Overload),
    Parameter(ParamId),
    Variable(VarId),
    Field(FieldId),
}

/// Error returned when a name is already bound in the scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDefinition;

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    defined: IndexMap<String, Binding>,
    resolved: HashMap<String, Binding>,
}

/// Arena-based storage for scopes
#[derive(Debug, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Create a new scope under an optional parent
    pub fn create(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            defined: IndexMap::new(),
            resolved: HashMap::new(),
        });
        id
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0 as usize].parent
    }

    /// Check if scope `inner` is `outer` or nested inside it
    pub fn is_nested_in(&self, inner: ScopeId, outer: ScopeId) -> bool {
        let mut current = Some(inner);
        while let Some(scope) = current {
            if scope == outer {
                return true;
            }
            current = self.parent(scope);
        }
        false
    }

    /// Resolve a name following the scope chain
    ///
    /// Results are cached per scope. When the local binding is an overload,
    /// the parent's overload for the same name (if any) is merged into a
    /// fresh copy, so the cached value never aliases the defined one.
    pub fn resolve(&mut self, scope: ScopeId, name: &str) -> Option<Binding> {
        if let Some(binding) = self.scopes[scope.0 as usize].resolved.get(name) {
            return Some(binding.clone());
        }

        let parent = self.parent(scope);
        let local = self.scopes[scope.0 as usize].defined.get(name).cloned();

        let result = match local {
            Some(Binding::Overload(mut overload)) => {
                if let Some(parent) = parent {
                    if let Some(Binding::Overload(parent_overload)) = self.resolve(parent, name) {
                        overload.extend(&parent_overload);
                    }
                }
                Some(Binding::Overload(overload))
            }
            Some(binding) => Some(binding),
            None => parent.and_then(|p| self.resolve(p, name)),
        };

        // Misses are not cached: assignment may introduce the name later.
        if let Some(binding) = &result {
            self.scopes[scope.0 as usize]
                .resolved
                .insert(name.to_string(), binding.clone());
        }
        result
    }

    /// Resolve in this scope's local definitions only
    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> Option<Binding> {
        self.scopes[scope.0 as usize].defined.get(name).cloned()
    }

    /// Bind a name in a scope
    ///
    /// Functions auto-wrap into an overload and merge with an existing one;
    /// any other rebinding of an existing name is a duplicate definition.
    pub fn append(
        &mut self,
        scope: ScopeId,
        name: &str,
        binding: Binding,
    ) -> Result<(), DuplicateDefinition> {
        let defined = &mut self.scopes[scope.0 as usize].defined;
        match (defined.get_mut(name), binding) {
            (None, binding) => {
                defined.insert(name.to_string(), binding);
                Ok(())
            }
            (Some(Binding::Overload(existing)), Binding::Overload(new)) => {
                existing.extend(&new);
                Ok(())
            }
            _ => Err(DuplicateDefinition),
        }
    }

    /// Bind a function, wrapping it into an overload
    pub fn append_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        function: FuncId,
    ) -> Result<(), DuplicateDefinition> {
        self.append(scope, name, Binding::Overload(Overload::new(name, function)))
    }

    /// Names defined directly in a scope, in definition order
    pub fn defined_names(&self, scope: ScopeId) -> impl Iterator<Item = &str> {
        self.scopes[scope.0 as usize]
            .defined
            .keys()
            .map(|s| s.as_str())
    }
}
