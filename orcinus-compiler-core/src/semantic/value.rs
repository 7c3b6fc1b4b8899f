// Typed values and statements of the Orcinus symbol graph
//
// Values are the lowered form of expressions: every value carries its
// resolved type. Failed lowering produces `Value::Error` with a fresh
// poison type; poisoned operands suppress further diagnostics upstream.

use super::symbol::{FieldId, FuncId, ParamId, TypeId, VarId};
use crate::source::Location;

/// An attribute attached to a member, e.g. `[[native("orx_int_add")]]`
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub arguments: Vec<Value>,
    pub location: Location,
}

/// A typed expression node
#[derive(Debug, Clone)]
pub enum Value {
    Integer {
        ty: TypeId,
        value: i64,
        location: Location,
    },
    Boolean {
        ty: TypeId,
        value: bool,
        location: Location,
    },
    Str {
        ty: TypeId,
        value: String,
        location: Location,
    },
    /// A call bound to a specific (possibly instantiated) function
    Call {
        function: FuncId,
        arguments: Vec<Value>,
        ty: TypeId,
        location: Location,
    },
    /// Construction of a type instance
    New {
        ty: TypeId,
        arguments: Vec<Value>,
        location: Location,
    },
    /// A field access bound to an instance value
    BoundedField {
        instance: Box<Value>,
        field: FieldId,
        ty: TypeId,
        location: Location,
    },
    Parameter {
        parameter: ParamId,
        ty: TypeId,
        location: Location,
    },
    Variable {
        variable: VarId,
        ty: TypeId,
        location: Location,
    },
    /// Poison value absorbing failed analysis
    Error { ty: TypeId, location: Location },
}

impl Value {
    /// The resolved type of this value; never absent
    pub fn ty(&self) -> TypeId {
        match self {
            Value::Integer { ty, .. }
            | Value::Boolean { ty, .. }
            | Value::Str { ty, .. }
            | Value::Call { ty, .. }
            | Value::New { ty, .. }
            | Value::BoundedField { ty, .. }
            | Value::Parameter { ty, .. }
            | Value::Variable { ty, .. }
            | Value::Error { ty, .. } => *ty,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Value::Integer { location, .. }
            | Value::Boolean { location, .. }
            | Value::Str { location, .. }
            | Value::Call { location, .. }
            | Value::New { location, .. }
            | Value::BoundedField { location, .. }
            | Value::Parameter { location, .. }
            | Value::Variable { location, .. }
            | Value::Error { location, .. } => location,
        }
    }

    /// True for values that may appear on the left of an assignment
    pub fn is_target(&self) -> bool {
        matches!(
            self,
            Value::Parameter { .. } | Value::Variable { .. } | Value::BoundedField { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error { .. })
    }
}

/// A lowered statement
#[derive(Debug, Clone)]
pub enum Statement {
    Block {
        statements: Vec<Statement>,
        location: Location,
    },
    Pass {
        location: Location,
    },
    Return {
        value: Option<Value>,
        location: Location,
    },
    Expression {
        value: Value,
    },
    Condition {
        condition: Value,
        then_statement: Box<Statement>,
        else_statement: Option<Box<Statement>>,
        location: Location,
    },
    While {
        condition: Value,
        then_statement: Box<Statement>,
        else_statement: Option<Box<Statement>>,
        location: Location,
    },
    Assign {
        target: Value,
        source: Value,
        location: Location,
    },
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Block { location, .. }
            | Statement::Pass { location }
            | Statement::Return { location, .. }
            | Statement::Condition { location, .. }
            | Statement::While { location, .. }
            | Statement::Assign { location, .. } => location,
            Statement::Expression { value } => value.location(),
        }
    }
}
