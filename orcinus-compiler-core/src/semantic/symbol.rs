// Symbol arenas for Orcinus semantic analysis
//
// All symbols live in arenas owned by one `SymbolTable` and are addressed
// by typed ids. Identity equality of ids implements the identity equality
// of symbols; cross-module references are plain ids, so the graph carries
// no owning back-pointers.

use super::scope::{Binding, DuplicateDefinition, ScopeId, Scopes};
use super::types::TypeData;
use super::value::{Attribute, Statement, Value};
use crate::source::Location;
use indexmap::IndexMap;

macro_rules! symbol_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

symbol_id!(/** Identifier of a module */ ModuleId);
symbol_id!(/** Identifier of a type symbol */ TypeId);
symbol_id!(/** Identifier of a function */ FuncId);
symbol_id!(/** Identifier of a field */ FieldId);
symbol_id!(/** Identifier of a parameter */ ParamId);
symbol_id!(/** Identifier of a local variable */ VarId);

/// The container a symbol belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Module(ModuleId),
    Type(TypeId),
}

/// A member of a container (module, class, or struct)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberId {
    Type(TypeId),
    Function(FuncId),
    Field(FieldId),
}

/// A generic definition eligible for instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericRef {
    Type(TypeId),
    Function(FuncId),
}

/// Key of the per-module generic-instance cache
pub type InstanceKey = (GenericRef, Vec<TypeId>);

/// A module: named container of members and functions, owning its root
/// scope and the cache of generic instances created inside it
#[derive(Debug)]
pub struct ModuleData {
    pub name: String,
    pub location: Location,
    pub scope: ScopeId,
    pub members: Vec<MemberId>,
    pub functions: Vec<FuncId>,
    pub instances: IndexMap<InstanceKey, GenericRef>,
}

/// A function symbol
#[derive(Debug)]
pub struct FunctionData {
    pub owner: Owner,
    pub name: String,
    /// The arrow type (always `TypeKind::Function`)
    pub fn_type: TypeId,
    pub parameters: Vec<ParamId>,
    pub variables: Vec<VarId>,
    pub body: Option<Statement>,
    pub generic_parameters: Vec<TypeId>,
    pub generic_arguments: Vec<TypeId>,
    /// The generic definition this function was instantiated from
    pub definition: Option<FuncId>,
    pub attributes: Vec<Attribute>,
    pub location: Location,
}

/// A field of a class or struct
#[derive(Debug)]
pub struct FieldData {
    pub owner: TypeId,
    pub name: String,
    pub ty: TypeId,
    pub location: Location,
}

/// A function parameter
#[derive(Debug)]
pub struct ParameterData {
    pub owner: FuncId,
    pub name: String,
    pub ty: TypeId,
    pub location: Location,
}

/// A function-local variable
#[derive(Debug)]
pub struct VariableData {
    pub name: String,
    pub ty: TypeId,
    pub location: Location,
}

/// Arena storage for every symbol of an analysis session
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub(crate) modules: Vec<ModuleData>,
    pub(crate) types: Vec<TypeData>,
    pub(crate) functions: Vec<FunctionData>,
    pub(crate) fields: Vec<FieldData>,
    pub(crate) parameters: Vec<ParameterData>,
    pub(crate) variables: Vec<VariableData>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Modules ---

    pub fn alloc_module(
        &mut self,
        name: impl Into<String>,
        location: Location,
        scope: ScopeId,
    ) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleData {
            name: name.into(),
            location,
            scope,
            members: Vec::new(),
            functions: Vec::new(),
            instances: IndexMap::new(),
        });
        id
    }

    pub fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.0 as usize]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut ModuleData {
        &mut self.modules[id.0 as usize]
    }

    /// Cached instance for (generic definition, type arguments), if any
    pub fn find_instance(&self, module: ModuleId, key: &InstanceKey) -> Option<GenericRef> {
        self.module(module).instances.get(key).copied()
    }

    pub fn register_instance(&mut self, module: ModuleId, key: InstanceKey, instance: GenericRef) {
        self.module_mut(module).instances.insert(key, instance);
    }

    // --- Types ---

    pub fn alloc_type(&mut self, data: TypeData) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(data);
        id
    }

    pub fn ty(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeData {
        &mut self.types[id.0 as usize]
    }

    // --- Functions ---

    /// Allocate a function and record it in its owning module's function list
    pub fn alloc_function(&mut self, data: FunctionData) -> FuncId {
        let module = self.owner_module(data.owner);
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(data);
        self.module_mut(module).functions.push(id);
        id
    }

    pub fn function(&self, id: FuncId) -> &FunctionData {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut FunctionData {
        &mut self.functions[id.0 as usize]
    }

    /// The function's declared parameter types
    pub fn param_types(&self, id: FuncId) -> Vec<TypeId> {
        self.function(id)
            .parameters
            .iter()
            .map(|&p| self.parameter(p).ty)
            .collect()
    }

    /// The function's return type
    pub fn return_type(&self, id: FuncId) -> TypeId {
        self.function_return_type(self.function(id).fn_type)
    }

    /// True if the function is marked `native`
    pub fn is_native(&self, id: FuncId) -> bool {
        self.function(id)
            .attributes
            .iter()
            .any(|attr| attr.name == "native")
    }

    /// The external name of a native function: the attribute's string
    /// argument if given, otherwise the function's own name
    pub fn native_name(&self, id: FuncId) -> Option<String> {
        let function = self.function(id);
        let attr = function.attributes.iter().find(|a| a.name == "native")?;
        match attr.arguments.first() {
            Some(Value::Str { value, .. }) => Some(value.clone()),
            _ => Some(function.name.clone()),
        }
    }

    // --- Fields, parameters, variables ---

    pub fn alloc_field(&mut self, data: FieldData) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(data);
        id
    }

    pub fn field(&self, id: FieldId) -> &FieldData {
        &self.fields[id.0 as usize]
    }

    pub fn alloc_parameter(&mut self, data: ParameterData) -> ParamId {
        let id = ParamId(self.parameters.len() as u32);
        self.parameters.push(data);
        id
    }

    pub fn parameter(&self, id: ParamId) -> &ParameterData {
        &self.parameters[id.0 as usize]
    }

    pub fn parameter_mut(&mut self, id: ParamId) -> &mut ParameterData {
        &mut self.parameters[id.0 as usize]
    }

    pub fn alloc_variable(&mut self, data: VariableData) -> VarId {
        let id = VarId(self.variables.len() as u32);
        self.variables.push(data);
        id
    }

    pub fn variable(&self, id: VarId) -> &VariableData {
        &self.variables[id.0 as usize]
    }

    // --- Containers ---

    /// The module a symbol ultimately belongs to
    pub fn owner_module(&self, owner: Owner) -> ModuleId {
        match owner {
            Owner::Module(module) => module,
            Owner::Type(ty) => self.owner_module(self.ty(ty).owner),
        }
    }

    /// The container scope of an owner
    pub fn owner_scope(&self, owner: Owner) -> ScopeId {
        match owner {
            Owner::Module(module) => self.module(module).scope,
            Owner::Type(ty) => self.ty(ty).scope,
        }
    }

    /// Name of a member symbol
    pub fn member_name(&self, member: MemberId) -> &str {
        match member {
            MemberId::Type(ty) => &self.ty(ty).name,
            MemberId::Function(func) => &self.function(func).name,
            MemberId::Field(field) => &self.field(field).name,
        }
    }

    /// Add a member to a container: records it in the member list and binds
    /// its name into the container's own scope
    pub fn add_member(
        &mut self,
        owner: Owner,
        member: MemberId,
        scopes: &mut Scopes,
    ) -> Result<(), DuplicateDefinition> {
        let scope = self.owner_scope(owner);
        let name = self.member_name(member).to_string();
        let result = match member {
            MemberId::Type(ty) => scopes.append(scope, &name, Binding::Type(ty)),
            MemberId::Function(func) => scopes.append_function(scope, &name, func),
            MemberId::Field(field) => scopes.append(scope, &name, Binding::Field(field)),
        };
        match owner {
            Owner::Module(module) => self.module_mut(module).members.push(member),
            Owner::Type(ty) => self.ty_mut(ty).members.push(member),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::types::TypeKind;

    #[test]
    fn test_module_functions_list() {
        let mut scopes = Scopes::new();
        let mut symbols = SymbolTable::new();
        let scope = scopes.create(None);
        let module = symbols.alloc_module("main", Location::default(), scope);

        let void = symbols.alloc_type(TypeData::primitive(
            TypeKind::Void,
            Owner::Module(module),
            "void",
            Location::default(),
            scopes.create(None),
        ));
        let fn_type = symbols.alloc_type(TypeData::function(
            Owner::Module(module),
            vec![],
            void,
            Location::default(),
            scopes.create(None),
        ));
        let func = symbols.alloc_function(FunctionData {
            owner: Owner::Module(module),
            name: "f".into(),
            fn_type,
            parameters: vec![],
            variables: vec![],
            body: None,
            generic_parameters: vec![],
            generic_arguments: vec![],
            definition: None,
            attributes: vec![],
            location: Location::default(),
        });

        assert_eq!(symbols.module(module).functions, vec![func]);
        assert_eq!(symbols.return_type(func), void);
    }

    #[test]
    fn test_instance_cache_round_trip() {
        let mut scopes = Scopes::new();
        let mut symbols = SymbolTable::new();
        let scope = scopes.create(None);
        let module = symbols.alloc_module("main", Location::default(), scope);

        let int_ty = symbols.alloc_type(TypeData::primitive(
            TypeKind::Int,
            Owner::Module(module),
            "int",
            Location::default(),
            scopes.create(None),
        ));
        let generic = symbols.alloc_type(TypeData::primitive(
            TypeKind::Struct,
            Owner::Module(module),
            "Box",
            Location::default(),
            scopes.create(None),
        ));

        let key = (GenericRef::Type(generic), vec![int_ty]);
        assert_eq!(symbols.find_instance(module, &key), None);
        symbols.register_instance(module, key.clone(), GenericRef::Type(generic));
        assert_eq!(
            symbols.find_instance(module, &key),
            Some(GenericRef::Type(generic))
        );
    }
}
