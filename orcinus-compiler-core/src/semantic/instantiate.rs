// Monomorphization for Orcinus
//
// Given a generic symbol and a tuple of type arguments, produces a
// monomorphic copy. One `Instantiator` is one per-call context: it maps
// generic parameters to their bound arguments and original symbols to
// their instantiated counterparts, so shared subterms rewrite
// consistently. The per-module instance cache guarantees referential
// identity for equal instantiations.

use super::scope::Scopes;
use super::symbol::{
    FieldData, FieldId, FuncId, FunctionData, GenericRef, InstanceKey, ModuleId, Owner,
    ParamId, ParameterData, SymbolTable, TypeId, VarId, VariableData,
};
use super::symbol::MemberId;
use super::types::{TypeData, TypeKind};
use super::value::{Statement, Value};
use thiserror::Error;

/// Failure to instantiate; user-level variants become diagnostics, the
/// internal variant terminates analysis of the current module
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstantiateError {
    #[error("type '{0}' is not generic")]
    NotGeneric(String),
    #[error("wrong number of type arguments for '{0}': expected {1}, got {2}")]
    ArityMismatch(String, usize, usize),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Per-call instantiation context
pub struct Instantiator<'a> {
    symbols: &'a mut SymbolTable,
    scopes: &'a mut Scopes,
    module: ModuleId,
    type_map: std::collections::HashMap<TypeId, TypeId>,
    func_map: std::collections::HashMap<FuncId, FuncId>,
    field_map: std::collections::HashMap<FieldId, FieldId>,
    param_map: std::collections::HashMap<ParamId, ParamId>,
    var_map: std::collections::HashMap<VarId, VarId>,
}

impl<'a> Instantiator<'a> {
    pub fn new(symbols: &'a mut SymbolTable, scopes: &'a mut Scopes, module: ModuleId) -> Self {
        Self {
            symbols,
            scopes,
            module,
            type_map: Default::default(),
            func_map: Default::default(),
            field_map: Default::default(),
            param_map: Default::default(),
            var_map: Default::default(),
        }
    }

    /// Instantiate a generic class or struct with concrete arguments
    pub fn instantiate_type(
        &mut self,
        generic: TypeId,
        arguments: Vec<TypeId>,
    ) -> Result<TypeId, InstantiateError> {
        let definition = self.symbols.ty(generic).definition.unwrap_or(generic);
        let (kind, name, location, parameters) = {
            let def = self.symbols.ty(definition);
            (
                def.kind.clone(),
                def.name.clone(),
                def.location.clone(),
                def.generic_parameters.clone(),
            )
        };

        if !matches!(kind, TypeKind::Struct | TypeKind::Class) || parameters.is_empty() {
            return Err(InstantiateError::NotGeneric(name));
        }
        if parameters.len() != arguments.len() {
            return Err(InstantiateError::ArityMismatch(
                name,
                parameters.len(),
                arguments.len(),
            ));
        }

        let key: InstanceKey = (GenericRef::Type(definition), arguments.clone());
        if let Some(GenericRef::Type(instance)) = self.symbols.find_instance(self.module, &key) {
            return Ok(instance);
        }

        for (&param, &arg) in parameters.iter().zip(&arguments) {
            self.type_map.insert(param, arg);
        }

        let scope = self.scopes.create(None);
        let instance = self.symbols.alloc_type(TypeData {
            kind,
            owner: Owner::Module(self.module),
            name,
            location,
            scope,
            members: Vec::new(),
            generic_parameters: Vec::new(),
            generic_arguments: arguments,
            definition: Some(definition),
        });
        // Registered before members rewrite so recursive references
        // (a field of type Pair[A] inside Pair) resolve to this instance.
        self.symbols
            .register_instance(self.module, key, GenericRef::Type(instance));
        self.type_map.insert(generic, instance);
        self.type_map.insert(definition, instance);

        let members = self.symbols.ty(definition).members.clone();
        for member in members {
            let new_member = match member {
                MemberId::Field(field) => MemberId::Field(self.rewrite_field(field)?),
                MemberId::Function(func) => MemberId::Function(self.rewrite_function(
                    func,
                    Owner::Type(instance),
                    Vec::new(),
                    Some(func),
                    None,
                )?),
                MemberId::Type(ty) => MemberId::Type(self.rewrite_type(ty)?),
            };
            let _ = self
                .symbols
                .add_member(Owner::Type(instance), new_member, self.scopes);
        }

        Ok(instance)
    }

    /// Instantiate a generic function with concrete arguments
    pub fn instantiate_function(
        &mut self,
        generic: FuncId,
        arguments: Vec<TypeId>,
    ) -> Result<FuncId, InstantiateError> {
        let definition = self.symbols.function(generic).definition.unwrap_or(generic);
        let (name, parameters) = {
            let def = self.symbols.function(definition);
            (def.name.clone(), def.generic_parameters.clone())
        };

        if parameters.is_empty() {
            return Err(InstantiateError::NotGeneric(name));
        }
        if parameters.len() != arguments.len() {
            return Err(InstantiateError::ArityMismatch(
                name,
                parameters.len(),
                arguments.len(),
            ));
        }

        let key: InstanceKey = (GenericRef::Function(definition), arguments.clone());
        if let Some(GenericRef::Function(instance)) = self.symbols.find_instance(self.module, &key)
        {
            return Ok(instance);
        }

        for (&param, &arg) in parameters.iter().zip(&arguments) {
            self.type_map.insert(param, arg);
        }

        self.rewrite_function(
            definition,
            Owner::Module(self.module),
            arguments,
            Some(definition),
            Some(key),
        )
    }

    /// Clone a function under the current substitution. Used both for
    /// generic function instantiation and for methods of instantiated types.
    fn rewrite_function(
        &mut self,
        func: FuncId,
        owner: Owner,
        generic_arguments: Vec<TypeId>,
        definition: Option<FuncId>,
        cache_key: Option<InstanceKey>,
    ) -> Result<FuncId, InstantiateError> {
        let (name, location, attributes, fn_type) = {
            let data = self.symbols.function(func);
            (
                data.name.clone(),
                data.location.clone(),
                data.attributes.clone(),
                data.fn_type,
            )
        };
        let new_fn_type = self.rewrite_type(fn_type)?;

        let instance = self.symbols.alloc_function(FunctionData {
            owner,
            name,
            fn_type: new_fn_type,
            parameters: Vec::new(),
            variables: Vec::new(),
            body: None,
            generic_parameters: Vec::new(),
            generic_arguments,
            definition,
            attributes,
            location,
        });
        self.func_map.insert(func, instance);
        // The cache entry exists before the body rewrites, so recursive
        // calls inside the body find this instance instead of looping.
        if let Some(key) = cache_key {
            self.symbols
                .register_instance(self.module, key, GenericRef::Function(instance));
        }

        let parameters = self.symbols.function(func).parameters.clone();
        for param in parameters {
            let (param_name, param_location, param_ty) = {
                let data = self.symbols.parameter(param);
                (data.name.clone(), data.location.clone(), data.ty)
            };
            let new_ty = self.rewrite_type(param_ty)?;
            let new_param = self.symbols.alloc_parameter(ParameterData {
                owner: instance,
                name: param_name,
                ty: new_ty,
                location: param_location,
            });
            self.param_map.insert(param, new_param);
            self.symbols.function_mut(instance).parameters.push(new_param);
        }

        let variables = self.symbols.function(func).variables.clone();
        for var in variables {
            let (var_name, var_location, var_ty) = {
                let data = self.symbols.variable(var);
                (data.name.clone(), data.location.clone(), data.ty)
            };
            let new_ty = self.rewrite_type(var_ty)?;
            let new_var = self.symbols.alloc_variable(VariableData {
                name: var_name,
                ty: new_ty,
                location: var_location,
            });
            self.var_map.insert(var, new_var);
            self.symbols.function_mut(instance).variables.push(new_var);
        }

        if let Some(body) = self.symbols.function(func).body.clone() {
            let new_body = self.rewrite_statement(&body)?;
            self.symbols.function_mut(instance).body = Some(new_body);
        }

        Ok(instance)
    }

    /// Rewrite a type under the current substitution
    pub fn rewrite_type(&mut self, ty: TypeId) -> Result<TypeId, InstantiateError> {
        if let Some(&mapped) = self.type_map.get(&ty) {
            return Ok(mapped);
        }

        enum Shape {
            Function(Vec<TypeId>, TypeId, crate::source::Location),
            Applied(Vec<TypeId>),
            Definition(Vec<TypeId>),
            Plain,
        }

        let shape = {
            let data = self.symbols.ty(ty);
            match &data.kind {
                TypeKind::Function {
                    parameters,
                    return_type,
                } => Shape::Function(parameters.clone(), *return_type, data.location.clone()),
                _ if !data.generic_arguments.is_empty() => {
                    Shape::Applied(data.generic_arguments.clone())
                }
                _ if !data.generic_parameters.is_empty() => {
                    Shape::Definition(data.generic_parameters.clone())
                }
                _ => Shape::Plain,
            }
        };

        match shape {
            Shape::Plain => Ok(ty),
            Shape::Function(parameters, return_type, location) => {
                let new_params = parameters
                    .iter()
                    .map(|&p| self.rewrite_type(p))
                    .collect::<Result<Vec<_>, _>>()?;
                let new_ret = self.rewrite_type(return_type)?;
                if new_params == parameters && new_ret == return_type {
                    return Ok(ty);
                }
                let scope = self.scopes.create(None);
                let id = self.symbols.alloc_type(TypeData::function(
                    Owner::Module(self.module),
                    new_params,
                    new_ret,
                    location,
                    scope,
                ));
                self.type_map.insert(ty, id);
                Ok(id)
            }
            Shape::Applied(arguments) => {
                let new_args = arguments
                    .iter()
                    .map(|&a| self.rewrite_type(a))
                    .collect::<Result<Vec<_>, _>>()?;
                if new_args == arguments {
                    return Ok(ty);
                }
                let instance = self.instantiate_type(ty, new_args)?;
                self.type_map.insert(ty, instance);
                Ok(instance)
            }
            Shape::Definition(parameters) => {
                let new_args = parameters
                    .iter()
                    .map(|&p| self.rewrite_type(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if new_args == parameters {
                    return Ok(ty);
                }
                let instance = self.instantiate_type(ty, new_args)?;
                self.type_map.insert(ty, instance);
                Ok(instance)
            }
        }
    }

    fn rewrite_field(&mut self, field: FieldId) -> Result<FieldId, InstantiateError> {
        if let Some(&mapped) = self.field_map.get(&field) {
            return Ok(mapped);
        }
        let (owner, name, ty, location) = {
            let data = self.symbols.field(field);
            (data.owner, data.name.clone(), data.ty, data.location.clone())
        };
        let new_owner = self.rewrite_type(owner)?;
        let new_ty = self.rewrite_type(ty)?;
        if new_owner == owner && new_ty == ty {
            return Ok(field);
        }
        let id = self.symbols.alloc_field(FieldData {
            owner: new_owner,
            name,
            ty: new_ty,
            location,
        });
        self.field_map.insert(field, id);
        Ok(id)
    }

    /// Rewrite a bound callee: an already-instantiated generic function
    /// whose arguments mention substituted parameters re-instantiates
    fn rewrite_callee(&mut self, func: FuncId) -> Result<FuncId, InstantiateError> {
        if let Some(&mapped) = self.func_map.get(&func) {
            return Ok(mapped);
        }
        let (definition, arguments) = {
            let data = self.symbols.function(func);
            (data.definition, data.generic_arguments.clone())
        };
        if !arguments.is_empty() {
            let new_args = arguments
                .iter()
                .map(|&a| self.rewrite_type(a))
                .collect::<Result<Vec<_>, _>>()?;
            if new_args != arguments {
                return self.instantiate_function(definition.unwrap_or(func), new_args);
            }
        }
        Ok(func)
    }

    /// Rewrite a statement recursively
    pub fn rewrite_statement(&mut self, statement: &Statement) -> Result<Statement, InstantiateError> {
        Ok(match statement {
            Statement::Block {
                statements,
                location,
            } => Statement::Block {
                statements: statements
                    .iter()
                    .map(|s| self.rewrite_statement(s))
                    .collect::<Result<Vec<_>, _>>()?,
                location: location.clone(),
            },
            Statement::Pass { location } => Statement::Pass {
                location: location.clone(),
            },
            Statement::Return { value, location } => Statement::Return {
                value: value.as_ref().map(|v| self.rewrite_value(v)).transpose()?,
                location: location.clone(),
            },
            Statement::Expression { value } => Statement::Expression {
                value: self.rewrite_value(value)?,
            },
            Statement::Condition {
                condition,
                then_statement,
                else_statement,
                location,
            } => Statement::Condition {
                condition: self.rewrite_value(condition)?,
                then_statement: Box::new(self.rewrite_statement(then_statement)?),
                else_statement: else_statement
                    .as_ref()
                    .map(|s| self.rewrite_statement(s).map(Box::new))
                    .transpose()?,
                location: location.clone(),
            },
            Statement::While {
                condition,
                then_statement,
                else_statement,
                location,
            } => Statement::While {
                condition: self.rewrite_value(condition)?,
                then_statement: Box::new(self.rewrite_statement(then_statement)?),
                else_statement: else_statement
                    .as_ref()
                    .map(|s| self.rewrite_statement(s).map(Box::new))
                    .transpose()?,
                location: location.clone(),
            },
            Statement::Assign {
                target,
                source,
                location,
            } => Statement::Assign {
                target: self.rewrite_value(target)?,
                source: self.rewrite_value(source)?,
                location: location.clone(),
            },
        })
    }

    /// Rewrite a value recursively; parameter and variable references go
    /// through the original-to-instance maps
    pub fn rewrite_value(&mut self, value: &Value) -> Result<Value, InstantiateError> {
        Ok(match value {
            Value::Integer {
                ty,
                value,
                location,
            } => Value::Integer {
                ty: self.rewrite_type(*ty)?,
                value: *value,
                location: location.clone(),
            },
            Value::Boolean {
                ty,
                value,
                location,
            } => Value::Boolean {
                ty: self.rewrite_type(*ty)?,
                value: *value,
                location: location.clone(),
            },
            Value::Str {
                ty,
                value,
                location,
            } => Value::Str {
                ty: self.rewrite_type(*ty)?,
                value: value.clone(),
                location: location.clone(),
            },
            Value::Error { ty, location } => Value::Error {
                ty: *ty,
                location: location.clone(),
            },
            Value::Call {
                function,
                arguments,
                ty,
                location,
            } => Value::Call {
                function: self.rewrite_callee(*function)?,
                arguments: arguments
                    .iter()
                    .map(|a| self.rewrite_value(a))
                    .collect::<Result<Vec<_>, _>>()?,
                ty: self.rewrite_type(*ty)?,
                location: location.clone(),
            },
            Value::New {
                ty,
                arguments,
                location,
            } => Value::New {
                ty: self.rewrite_type(*ty)?,
                arguments: arguments
                    .iter()
                    .map(|a| self.rewrite_value(a))
                    .collect::<Result<Vec<_>, _>>()?,
                location: location.clone(),
            },
            Value::BoundedField {
                instance,
                field,
                ty,
                location,
            } => Value::BoundedField {
                instance: Box::new(self.rewrite_value(instance)?),
                field: self.rewrite_field(*field)?,
                ty: self.rewrite_type(*ty)?,
                location: location.clone(),
            },
            Value::Parameter {
                parameter,
                location,
                ..
            } => {
                let mapped = self.param_map.get(parameter).copied().ok_or_else(|| {
                    InstantiateError::Internal("unmapped parameter reference".into())
                })?;
                Value::Parameter {
                    parameter: mapped,
                    ty: self.symbols.parameter(mapped).ty,
                    location: location.clone(),
                }
            }
            Value::Variable {
                variable, location, ..
            } => {
                let mapped = self.var_map.get(variable).copied().ok_or_else(|| {
                    InstantiateError::Internal("unmapped variable reference".into())
                })?;
                Value::Variable {
                    variable: mapped,
                    ty: self.symbols.variable(mapped).ty,
                    location: location.clone(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::scope::Scopes;
    use crate::source::Location;

    struct Setup {
        scopes: Scopes,
        symbols: SymbolTable,
        module: ModuleId,
        int_ty: TypeId,
        bool_ty: TypeId,
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
        let bool_scope = scopes.create(None);
        let bool_ty = symbols.alloc_type(TypeData::primitive(
            TypeKind::Bool,
            Owner::Module(module),
            "bool",
            Location::default(),
            bool_scope,
        ));
        Setup {
            scopes,
            symbols,
            module,
            int_ty,
            bool_ty,
        }
    }

    fn generic_pair(setup: &mut Setup) -> TypeId {
        let a = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Generic,
            Owner::Module(setup.module),
            "A",
            Location::default(),
            setup.scopes.create(None),
        ));
        let b = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Generic,
            Owner::Module(setup.module),
            "B",
            Location::default(),
            setup.scopes.create(None),
        ));
        let pair_scope = setup.scopes.create(None);
        let pair = setup.symbols.alloc_type(TypeData {
            kind: TypeKind::Struct,
            owner: Owner::Module(setup.module),
            name: "Pair".into(),
            location: Location::default(),
            scope: pair_scope,
            members: vec![],
            generic_parameters: vec![a, b],
            generic_arguments: vec![],
            definition: None,
        });
        let field_a = setup.symbols.alloc_field(FieldData {
            owner: pair,
            name: "a".into(),
            ty: a,
            location: Location::default(),
        });
        let field_b = setup.symbols.alloc_field(FieldData {
            owner: pair,
            name: "b".into(),
            ty: b,
            location: Location::default(),
        });
        setup
            .symbols
            .add_member(Owner::Type(pair), MemberId::Field(field_a), &mut setup.scopes)
            .unwrap();
        setup
            .symbols
            .add_member(Owner::Type(pair), MemberId::Field(field_b), &mut setup.scopes)
            .unwrap();
        pair
    }

    #[test]
    fn test_struct_instance_clones_fields() {
        let mut setup = setup();
        let pair = generic_pair(&mut setup);

        let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
        let instance = ctx
            .instantiate_type(pair, vec![setup.int_ty, setup.bool_ty])
            .unwrap();

        let data = setup.symbols.ty(instance);
        assert_eq!(data.generic_arguments, vec![setup.int_ty, setup.bool_ty]);
        assert_eq!(data.definition, Some(pair));
        assert_eq!(data.members.len(), 2);

        let MemberId::Field(field_a) = data.members[0] else {
            panic!("expected field");
        };
        let MemberId::Field(field_b) = data.members[1] else {
            panic!("expected field");
        };
        assert_eq!(setup.symbols.field(field_a).ty, setup.int_ty);
        assert_eq!(setup.symbols.field(field_b).ty, setup.bool_ty);
        assert_eq!(setup.symbols.field(field_a).owner, instance);
    }

    #[test]
    fn test_instance_cache_idempotent() {
        let mut setup = setup();
        let pair = generic_pair(&mut setup);

        let first = {
            let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
            ctx.instantiate_type(pair, vec![setup.int_ty, setup.bool_ty])
                .unwrap()
        };
        let second = {
            let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
            ctx.instantiate_type(pair, vec![setup.int_ty, setup.bool_ty])
                .unwrap()
        };
        assert_eq!(first, second);

        // A different argument tuple is a different instance
        let third = {
            let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
            ctx.instantiate_type(pair, vec![setup.bool_ty, setup.int_ty])
                .unwrap()
        };
        assert_ne!(first, third);
    }

    #[test]
    fn test_non_generic_type_rejected() {
        let mut setup = setup();
        let int_ty = setup.int_ty;
        let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
        assert!(matches!(
            ctx.instantiate_type(int_ty, vec![int_ty]),
            Err(InstantiateError::NotGeneric(_))
        ));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let mut setup = setup();
        let pair = generic_pair(&mut setup);
        let int_ty = setup.int_ty;
        let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
        assert!(matches!(
            ctx.instantiate_type(pair, vec![int_ty]),
            Err(InstantiateError::ArityMismatch(_, 2, 1))
        ));
    }

    #[test]
    fn test_generic_function_instantiation() {
        let mut setup = setup();
        // def id[T](x: T) -> T: return x
        let t_param = setup.symbols.alloc_type(TypeData::primitive(
            TypeKind::Generic,
            Owner::Module(setup.module),
            "T",
            Location::default(),
            setup.scopes.create(None),
        ));
        let fn_type = setup.symbols.alloc_type(TypeData::function(
            Owner::Module(setup.module),
            vec![t_param],
            t_param,
            Location::default(),
            setup.scopes.create(None),
        ));
        let func = setup.symbols.alloc_function(FunctionData {
            owner: Owner::Module(setup.module),
            name: "id".into(),
            fn_type,
            parameters: vec![],
            variables: vec![],
            body: None,
            generic_parameters: vec![t_param],
            generic_arguments: vec![],
            definition: None,
            attributes: vec![],
            location: Location::default(),
        });
        let param = setup.symbols.alloc_parameter(ParameterData {
            owner: func,
            name: "x".into(),
            ty: t_param,
            location: Location::default(),
        });
        setup.symbols.function_mut(func).parameters.push(param);
        setup.symbols.function_mut(func).body = Some(Statement::Return {
            value: Some(Value::Parameter {
                parameter: param,
                ty: t_param,
                location: Location::default(),
            }),
            location: Location::default(),
        });

        let int_ty = setup.int_ty;
        let instance = {
            let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
            ctx.instantiate_function(func, vec![int_ty]).unwrap()
        };

        let data = setup.symbols.function(instance);
        assert_eq!(data.definition, Some(func));
        assert_eq!(data.generic_arguments, vec![int_ty]);
        assert_eq!(setup.symbols.param_types(instance), vec![int_ty]);
        assert_eq!(setup.symbols.return_type(instance), int_ty);

        // Body rewrote the parameter reference onto the instance's parameter
        let Some(Statement::Return {
            value: Some(Value::Parameter { parameter, ty, .. }),
            ..
        }) = &setup.symbols.function(instance).body
        else {
            panic!("expected rewritten return");
        };
        assert_eq!(*ty, int_ty);
        assert_eq!(setup.symbols.parameter(*parameter).owner, instance);

        // Same arguments give the same instance
        let again = {
            let mut ctx = Instantiator::new(&mut setup.symbols, &mut setup.scopes, setup.module);
            ctx.instantiate_function(func, vec![int_ty]).unwrap()
        };
        assert_eq!(instance, again);
    }
}
