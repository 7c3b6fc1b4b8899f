// Type symbols for Orcinus semantic analysis
//
// Types are containers: they own a scope and a member list. Two type
// symbols are equal iff they are the same arena entry; only function arrow
// types compare structurally. Error types are freshly allocated wherever a
// subtree is poisoned, so they never compare equal to anything else.

use super::scope::ScopeId;
use super::symbol::{MemberId, Owner, SymbolTable, TypeId};
use crate::source::Location;

/// Concrete kind of a type symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Str,
    /// Poison type produced by failed analysis
    Error,
    Struct,
    Class,
    /// The arrow type of a function
    Function {
        parameters: Vec<TypeId>,
        return_type: TypeId,
    },
    /// A type-parameter placeholder introduced by `[T]`
    Generic,
}

/// A type symbol
#[derive(Debug)]
pub struct TypeData {
    pub kind: TypeKind,
    pub owner: Owner,
    pub name: String,
    pub location: Location,
    /// The container scope holding fields and methods
    pub scope: ScopeId,
    pub members: Vec<MemberId>,
    pub generic_parameters: Vec<TypeId>,
    pub generic_arguments: Vec<TypeId>,
    /// The generic definition this type was instantiated from
    pub definition: Option<TypeId>,
}

impl TypeData {
    /// A type without generic parameters, arguments, or definition link
    pub fn primitive(
        kind: TypeKind,
        owner: Owner,
        name: impl Into<String>,
        location: Location,
        scope: ScopeId,
    ) -> Self {
        Self {
            kind,
            owner,
            name: name.into(),
            location,
            scope,
            members: Vec::new(),
            generic_parameters: Vec::new(),
            generic_arguments: Vec::new(),
            definition: None,
        }
    }

    /// A function arrow type
    pub fn function(
        owner: Owner,
        parameters: Vec<TypeId>,
        return_type: TypeId,
        location: Location,
        scope: ScopeId,
    ) -> Self {
        Self {
            kind: TypeKind::Function {
                parameters,
                return_type,
            },
            owner,
            name: "Function".into(),
            location,
            scope,
            members: Vec::new(),
            generic_parameters: Vec::new(),
            generic_arguments: Vec::new(),
            definition: None,
        }
    }
}

impl SymbolTable {
    /// Identity equality, with structural equality for function arrow types
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (&self.ty(a).kind, &self.ty(b).kind) {
            (
                TypeKind::Function {
                    parameters: params_a,
                    return_type: ret_a,
                },
                TypeKind::Function {
                    parameters: params_b,
                    return_type: ret_b,
                },
            ) => {
                params_a.len() == params_b.len()
                    && self.types_equal(*ret_a, *ret_b)
                    && params_a
                        .iter()
                        .zip(params_b)
                        .all(|(&pa, &pb)| self.types_equal(pa, pb))
            }
            _ => false,
        }
    }

    /// True for the poison type
    pub fn is_error_type(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty).kind, TypeKind::Error)
    }

    /// True for type-parameter placeholders, generic definitions, and
    /// instances whose arguments still contain placeholders
    pub fn is_generic_type(&self, ty: TypeId) -> bool {
        let data = self.ty(ty);
        matches!(data.kind, TypeKind::Generic)
            || !data.generic_parameters.is_empty()
            || data
                .generic_arguments
                .iter()
                .any(|&arg| self.is_generic_type(arg))
    }

    /// True when the function has unbound generic parameters
    pub fn is_generic_function(&self, func: super::symbol::FuncId) -> bool {
        let data = self.function(func);
        !data.generic_parameters.is_empty()
            || data
                .generic_arguments
                .iter()
                .any(|&arg| self.is_generic_type(arg))
    }

    /// The return type of a function arrow type
    pub fn function_return_type(&self, fn_type: TypeId) -> TypeId {
        match &self.ty(fn_type).kind {
            TypeKind::Function { return_type, .. } => *return_type,
            _ => fn_type,
        }
    }

    /// Human-readable type name for diagnostics
    pub fn type_display(&self, ty: TypeId) -> String {
        let data = self.ty(ty);
        match &data.kind {
            TypeKind::Function {
                parameters,
                return_type,
            } => {
                let params = parameters
                    .iter()
                    .map(|&p| self.type_display(p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({}) -> {}", params, self.type_display(*return_type))
            }
            _ => {
                let arguments = if !data.generic_arguments.is_empty() {
                    &data.generic_arguments
                } else {
                    &data.generic_parameters
                };
                if arguments.is_empty() {
                    data.name.clone()
                } else {
                    let args = arguments
                        .iter()
                        .map(|&a| self.type_display(a))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}[{}]", data.name, args)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::scope::Scopes;

    fn setup() -> (Scopes, SymbolTable, super::super::symbol::ModuleId) {
        let mut scopes = Scopes::new();
        let mut symbols = SymbolTable::new();
        let scope = scopes.create(None);
        let module = symbols.alloc_module("main", Location::default(), scope);
        (scopes, symbols, module)
    }

    #[test]
    fn test_identity_equality() {
        let (mut scopes, mut symbols, module) = setup();
        let a = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            scopes.create(None),
        ));
        let b = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            scopes.create(None),
        ));

        // Two distinct symbols with identical shape are different types
        assert!(symbols.types_equal(a, a));
        assert!(!symbols.types_equal(a, b));
    }

    #[test]
    fn test_function_types_structural() {
        let (mut scopes, mut symbols, module) = setup();
        let int_ty = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            scopes.create(None),
        ));
        let f1 = symbols.alloc_type(TypeData::function(
            Owner::Module(module),
            vec![int_ty],
            int_ty,
            Location::default(),
            scopes.create(None),
        ));
        let f2 = symbols.alloc_type(TypeData::function(
            Owner::Module(module),
            vec![int_ty],
            int_ty,
            Location::default(),
            scopes.create(None),
        ));

        assert!(symbols.types_equal(f1, f2));
        assert_eq!(symbols.type_display(f1), "(int) -> int");
    }

    #[test]
    fn test_error_type_not_equal() {
        let (mut scopes, mut symbols, module) = setup();
        let e1 = symbols.alloc_type(TypeData::primitive(
            TypeKind::Error,
            Owner::Module(module),
            "<error>",
            Location::default(),
            scopes.create(None),
        ));
        let e2 = symbols.alloc_type(TypeData::primitive(
            TypeKind::Error,
            Owner::Module(module),
            "<error>",
            Location::default(),
            scopes.create(None),
        ));
        let int_ty = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            scopes.create(None),
        ));

        assert!(!symbols.types_equal(e1, e2));
        assert!(!symbols.types_equal(e1, int_ty));
        assert!(symbols.is_error_type(e1));
    }

    #[test]
    fn test_generic_display() {
        let (mut scopes, mut symbols, module) = setup();
        let t_param = symbols.alloc_type(TypeData {
            kind: TypeKind::Generic,
            owner: Owner::Module(module),
            name: "T".into(),
            location: Location::default(),
            scope: scopes.create(None),
            members: vec![],
            generic_parameters: vec![],
            generic_arguments: vec![],
            definition: None,
        });
        let pair = symbols.alloc_type(TypeData {
            kind: TypeKind::Struct,
            owner: Owner::Module(module),
            name: "Pair".into(),
            location: Location::default(),
            scope: scopes.create(None),
            members: vec![],
            generic_parameters: vec![t_param],
            generic_arguments: vec![],
            definition: None,
        });

        assert!(symbols.is_generic_type(t_param));
        assert!(symbols.is_generic_type(pair));
        assert_eq!(symbols.type_display(pair), "Pair[T]");
    }
}
