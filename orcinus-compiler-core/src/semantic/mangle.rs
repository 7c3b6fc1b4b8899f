// External name mangling for Orcinus
//
// Produces a stable externally-linkable name for every non-native function
// and type. The encoding is a reversed prefix-length scheme: parts are
// pushed innermost-first and the final string is the reversed
// concatenation, e.g.
//
//   ORX_FUNC_mainM::F1fA1Pi32Ri32        def f(x: int) -> int
//   ORX_TYPE_mainM::T4PairG2i32b         struct Pair[int, bool] instance
//
// Native functions short-circuit to their declared external name.

use super::symbol::{FuncId, Owner, SymbolTable, TypeId};
use super::types::TypeKind;

/// Builds mangled names over a symbol table
pub struct Mangler<'a> {
    symbols: &'a SymbolTable,
    parts: Vec<String>,
}

impl<'a> Mangler<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            parts: Vec::new(),
        }
    }

    /// Mangled name of a function
    pub fn mangle_function(&mut self, func: FuncId) -> String {
        if self.symbols.is_native(func) {
            if let Some(name) = self.symbols.native_name(func) {
                return name;
            }
        }

        self.parts.clear();
        let symbols = self.symbols;
        let data = symbols.function(func);
        let definition = data.definition.unwrap_or(func);

        self.push_type(symbols.return_type(func));
        self.push("R");
        for &param in data.parameters.iter().rev() {
            self.push_type(symbols.parameter(param).ty);
            self.push("P");
        }
        self.push(data.parameters.len().to_string());
        self.push("A");

        let generics = if !data.generic_arguments.is_empty() {
            data.generic_arguments.clone()
        } else {
            symbols.function(definition).generic_parameters.clone()
        };
        self.push_generics(&generics);

        self.push_named(&data.name);
        self.push("F");
        self.push("::");
        self.push_owner(symbols.function(definition).owner);
        self.push("ORX_FUNC_");
        self.construct()
    }

    /// Mangled name of a type; primitives use fixed short names
    pub fn mangle_type(&mut self, ty: TypeId) -> String {
        if let Some(short) = Self::primitive_name(&self.symbols.ty(ty).kind) {
            return short.to_string();
        }

        self.parts.clear();
        let symbols = self.symbols;
        let data = symbols.ty(ty);
        let definition = data.definition.unwrap_or(ty);

        let generics = if !data.generic_arguments.is_empty() {
            data.generic_arguments.clone()
        } else {
            symbols.ty(definition).generic_parameters.clone()
        };
        self.push_generics(&generics);

        self.push_named(&data.name);
        self.push("T");
        self.push("::");
        self.push_owner(symbols.ty(definition).owner);
        self.push("ORX_TYPE_");
        self.construct()
    }

    fn primitive_name(kind: &TypeKind) -> Option<&'static str> {
        match kind {
            TypeKind::Int => Some("i32"),
            TypeKind::Bool => Some("b"),
            TypeKind::Void => Some("v"),
            TypeKind::Str => Some("str"),
            _ => None,
        }
    }

    fn push(&mut self, part: impl Into<String>) {
        self.parts.push(part.into());
    }

    /// Push a name with its length prefix (reversed order)
    fn push_named(&mut self, name: &str) {
        self.parts.push(name.to_string());
        self.parts.push(name.len().to_string());
    }

    fn push_generics(&mut self, generics: &[TypeId]) {
        if generics.is_empty() {
            return;
        }
        for &generic in generics.iter().rev() {
            self.push_type(generic);
        }
        self.push(generics.len().to_string());
        self.push("G");
    }

    fn push_type(&mut self, ty: TypeId) {
        let text = match Self::primitive_name(&self.symbols.ty(ty).kind) {
            Some(short) => short.to_string(),
            None => self.symbols.type_display(ty),
        };
        self.push(text);
    }

    fn push_owner(&mut self, owner: Owner) {
        match owner {
            Owner::Module(module) => {
                self.push("M");
                self.push(self.symbols.module(module).name.clone());
            }
            Owner::Type(ty) => {
                self.push("T");
                self.push(self.symbols.ty(ty).name.clone());
                self.push_owner(self.symbols.ty(ty).owner);
            }
        }
    }

    fn construct(&mut self) -> String {
        self.parts.reverse();
        let result = self.parts.concat();
        self.parts.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::scope::Scopes;
    use crate::semantic::symbol::{FunctionData, ModuleId, ParameterData};
    use crate::semantic::types::TypeData;
    use crate::semantic::value::{Attribute, Value};
    use crate::source::Location;

    struct Setup {
        scopes: Scopes,
        symbols: SymbolTable,
        module: ModuleId,
        int_ty: TypeId,
    }

    fn setup() -> Setup {
        let mut scopes = Scopes::new();
        let mut symbols = SymbolTable::new();
        let scope = scopes.create(None);
        let module = symbols.alloc_module("main", Location::default(), scope);
        let int_scope = scopes.create(None);
        let int_ty = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            int_scope,
        ));
        Setup {
            scopes,
            symbols,
            module,
            int_ty,
        }
    }

    fn make_function(setup: &mut Setup, name: &str, attributes: Vec<Attribute>) -> FuncId {
        let fn_type = setup.symbols.alloc_type(TypeData::function(
            Owner::Module(setup.module),
            vec![setup.int_ty],
            setup.int_ty,
            Location::default(),
            setup.scopes.create(None),
        ));
        let func = setup.symbols.alloc_function(FunctionData {
            owner: Owner::Module(setup.module),
            name: name.into(),
            fn_type,
            parameters: vec![],
            variables: vec![],
            body: None,
            generic_parameters: vec![],
            generic_arguments: vec![],
            definition: None,
            attributes,
            location: Location::default(),
        });
        let param = setup.symbols.alloc_parameter(ParameterData {
            owner: func,
            name: "x".into(),
            ty: setup.int_ty,
            location: Location::default(),
        });
        setup.symbols.function_mut(func).parameters.push(param);
        func
    }

    #[test]
    fn test_plain_function() {
        let mut setup = setup();
        let func = make_function(&mut setup, "f", vec![]);
        let mut mangler = Mangler::new(&setup.symbols);
        assert_eq!(mangler.mangle_function(func), "ORX_FUNC_mainM::F1fA1Pi32Ri32");
    }

    #[test]
    fn test_native_with_name() {
        let mut setup = setup();
        let str_scope = setup.scopes.create(None);
        let str_ty = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Str,
            Owner::Module(setup.module),
            "str",
            Location::default(),
            str_scope,
        ));
        let attr = Attribute {
            name: "native".into(),
            arguments: vec![Value::Str {
                ty: str_ty,
                value: "foo".into(),
                location: Location::default(),
            }],
            location: Location::default(),
        };
        let func = make_function(&mut setup, "f", vec![attr]);
        let mut mangler = Mangler::new(&setup.symbols);
        assert_eq!(mangler.mangle_function(func), "foo");
    }

    #[test]
    fn test_native_without_name() {
        let mut setup = setup();
        let attr = Attribute {
            name: "native".into(),
            arguments: vec![],
            location: Location::default(),
        };
        let func = make_function(&mut setup, "f", vec![attr]);
        let mut mangler = Mangler::new(&setup.symbols);
        assert_eq!(mangler.mangle_function(func), "f");
    }

    #[test]
    fn test_primitive_types() {
        let setup = setup();
        let mut mangler = Mangler::new(&setup.symbols);
        assert_eq!(mangler.mangle_type(setup.int_ty), "i32");
    }

    #[test]
    fn test_generic_type_instance() {
        let mut setup = setup();
        let bool_scope = setup.scopes.create(None);
        let bool_ty = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Bool,
            Owner::Module(setup.module),
            "bool",
            Location::default(),
            bool_scope,
        ));
        let pair_def = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Struct,
            Owner::Module(setup.module),
            "Pair",
            Location::default(),
            setup.scopes.create(None),
        ));
        let instance = setup.symbols.alloc_type(TypeData {
            kind: TypeKind::Struct,
            owner: Owner::Module(setup.module),
            name: "Pair".into(),
            location: Location::default(),
            scope: setup.scopes.create(None),
            members: vec![],
            generic_parameters: vec![],
            generic_arguments: vec![setup.int_ty, bool_ty],
            definition: Some(pair_def),
        });

        let mut mangler = Mangler::new(&setup.symbols);
        assert_eq!(
            mangler.mangle_type(instance),
            "ORX_TYPE_mainM::T4PairG2i32b"
        );
    }
}
