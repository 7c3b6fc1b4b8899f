// Module analysis passes for Orcinus
//
// One `ModuleAnalyzer` drives the analysis of a single module in four
// passes over its CST:
//
//   1. annotate scopes   - each node gets a lexical scope
//   2. import symbols    - `from M import X` binds X into the root scope
//   3. declare symbols   - containers, fields, and signatures, with
//                          children ordered types / functions / others
//   4. emit bodies       - lower statements and expressions to typed form
//
// User errors become diagnostics and poison the affected subtree; internal
// invariant violations terminate analysis of the current module only.

use super::infer::{Concrete, Inference};
use super::instantiate::{InstantiateError, Instantiator};
use super::scope::{Binding, Overload, ScopeId};
use super::symbol::{
    FieldData, FuncId, FunctionData, MemberId, ModuleId, Owner, ParameterData, TypeId,
    VariableData,
};
use super::types::{TypeData, TypeKind};
use super::value::{Attribute, Statement, Value};
use super::{Declared, SemanticContext};
use crate::cst::{FunctionBody, Node, NodeId, SyntaxTree, UnaryOp};
use crate::lexer::TokenKind;
use crate::source::Location;
use crate::workspace::{Workspace, BUILTINS_MODULE};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

/// A name that failed to resolve, with its would-be diagnostic
struct LookupMiss {
    message: String,
    location: Location,
}

/// What a name or member expression resolved to
#[derive(Debug)]
enum Resolved {
    Value(Value),
    Type(TypeId),
    Overload(Overload),
    Module(ModuleId),
    Field(super::symbol::FieldId),
}

pub(crate) struct ModuleAnalyzer<'a, W: Workspace> {
    ctx: &'a mut SemanticContext<W>,
    tree: Rc<SyntaxTree>,
    module: ModuleId,
    module_name: String,
    root_scope: ScopeId,
    node_scopes: HashMap<NodeId, ScopeId>,
    node_symbols: HashMap<NodeId, Declared>,
    declared_functions: Vec<(NodeId, FuncId)>,
    function_stack: Vec<FuncId>,
    internal_error: Option<InstantiateError>,
}

type AnalyzeOutput = (
    HashMap<NodeId, ScopeId>,
    HashMap<NodeId, Declared>,
    Result<(), InstantiateError>,
);

impl<'a, W: Workspace> ModuleAnalyzer<'a, W> {
    pub(crate) fn new(
        ctx: &'a mut SemanticContext<W>,
        tree: Rc<SyntaxTree>,
        module: ModuleId,
        module_name: &str,
    ) -> Self {
        let root_scope = ctx.scopes.create(None);
        Self {
            ctx,
            tree,
            module,
            module_name: module_name.to_string(),
            root_scope,
            node_scopes: HashMap::new(),
            node_symbols: HashMap::new(),
            declared_functions: Vec::new(),
            function_stack: Vec::new(),
            internal_error: None,
        }
    }

    pub(crate) fn analyze(mut self) -> AnalyzeOutput {
        self.annotate_scopes();
        self.import_symbols();
        self.declare_symbols();
        self.emit_functions();

        let outcome = match self.internal_error {
            Some(error) => Err(error),
            None => Ok(()),
        };
        (self.node_scopes, self.node_symbols, outcome)
    }

    fn error(&mut self, message: impl Into<String>, location: Location) {
        self.ctx.diagnostics.error(message, location);
    }

    fn location(&self, node: NodeId) -> Location {
        self.tree.location(node).clone()
    }

    fn scope_of(&self, node: NodeId) -> ScopeId {
        self.node_scopes.get(&node).copied().unwrap_or(self.root_scope)
    }

    // =========================================================================
    // Pass 1: scope annotation
    // =========================================================================

    fn annotate_scopes(&mut self) {
        let tree = Rc::clone(&self.tree);
        self.annotate_node(&tree, tree.root(), self.root_scope);
    }

    fn annotate_node(&mut self, tree: &SyntaxTree, node: NodeId, parent: ScopeId) {
        let scope = match tree.node(node) {
            Node::Module(_) => parent,
            Node::Function(_) | Node::Class(_) | Node::Struct(_) | Node::Block(_) => {
                self.ctx.scopes.create(Some(parent))
            }
            _ => parent,
        };
        self.node_scopes.insert(node, scope);
        for child in tree.child_nodes(node) {
            self.annotate_node(tree, child, scope);
        }
    }

    // =========================================================================
    // Pass 2: imports
    // =========================================================================

    fn import_symbols(&mut self) {
        let tree = Rc::clone(&self.tree);
        let Node::Module(module_node) = tree.node(tree.root()) else {
            return;
        };

        for &import in &module_node.imports {
            match tree.node(import) {
                Node::ImportFrom(node) => {
                    let Node::QualifiedName(module_name) = tree.node(node.module) else {
                        continue;
                    };
                    self.import_from(&tree, module_name.text(), &node.aliases.items, import);
                }
                Node::Import(_) => {
                    let location = self.location(import);
                    self.error(
                        "plain 'import' is not supported; use 'from MODULE import NAME'",
                        location,
                    );
                }
                _ => {}
            }
        }
    }

    fn import_from(
        &mut self,
        tree: &SyntaxTree,
        module_name: String,
        aliases: &[NodeId],
        import: NodeId,
    ) {
        let imported = match self.ctx.load(&module_name) {
            Ok(module) => module,
            Err(error) => {
                let location = self.location(import);
                self.error(error.to_string(), location);
                return;
            }
        };

        for &alias_id in aliases {
            let Node::Alias(alias) = tree.node(alias_id) else {
                continue;
            };
            let Node::QualifiedName(name_node) = tree.node(alias.name) else {
                continue;
            };
            let name = name_node.text();
            let bound_name = alias
                .tok_alias
                .as_ref()
                .map(|tok| tok.text.clone())
                .unwrap_or_else(|| name.clone());

            let imported_scope = self.ctx.symbols.module(imported).scope;
            match self.ctx.scopes.resolve(imported_scope, &name) {
                Some(binding) => {
                    if self
                        .ctx
                        .scopes
                        .append(self.root_scope, &bound_name, binding)
                        .is_err()
                    {
                        let location = self.location(alias_id);
                        self.error(
                            format!("already defined symbol with name '{}'", bound_name),
                            location,
                        );
                    }
                }
                None => {
                    let location = self.location(alias_id);
                    self.error(
                        format!("cannot find symbol '{}' in module '{}'", name, module_name),
                        location,
                    );
                }
            }
        }
    }

    // =========================================================================
    // Pass 3: symbol declaration
    // =========================================================================

    fn declare_symbols(&mut self) {
        let tree = Rc::clone(&self.tree);
        let root = tree.root();
        self.node_symbols.insert(root, Declared::Module(self.module));

        let Node::Module(module_node) = tree.node(root) else {
            return;
        };
        self.declare_children(
            &tree,
            &module_node.members,
            self.root_scope,
            Owner::Module(self.module),
        );
    }

    /// Declare the members of a container, types first, then functions,
    /// then everything else, so forward references among methods and
    /// fields resolve cleanly.
    fn declare_children(
        &mut self,
        tree: &SyntaxTree,
        members: &[NodeId],
        scope: ScopeId,
        parent: Owner,
    ) {
        let mut types = Vec::new();
        let mut functions = Vec::new();
        let mut others = Vec::new();
        for &member in members {
            match tree.node(member) {
                Node::Class(_) | Node::Struct(_) => types.push(member),
                Node::Function(_) => functions.push(member),
                _ => others.push(member),
            }
        }
        for member in types.into_iter().chain(functions).chain(others) {
            self.declare_member(tree, member, scope, parent);
        }
    }

    fn declare_member(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId, parent: Owner) {
        match tree.node(node) {
            Node::Class(_) | Node::Struct(_) => self.declare_type(tree, node, scope, parent),
            Node::Function(_) => self.declare_function(tree, node, scope, parent),
            Node::Field(_) => self.declare_field(tree, node, scope, parent),
            Node::PassMember(_) => {}
            _ => {
                let location = self.location(node);
                self.error("unsupported member declaration", location);
            }
        }
    }

    fn declare_type(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId, parent: Owner) {
        let (name, generics, members, is_struct) = match tree.node(node) {
            Node::Struct(decl) => (
                decl.tok_name.text.clone(),
                decl.generics.clone(),
                type_body_members(&decl.body),
                true,
            ),
            Node::Class(decl) => (
                decl.tok_name.text.clone(),
                decl.generics.clone(),
                type_body_members(&decl.body),
                false,
            ),
            _ => return,
        };
        let location = self.location(node);
        let node_scope = self.scope_of(node);

        // The built-in module declares the primitives through their names
        let kind = if self.module_name == BUILTINS_MODULE {
            match (is_struct, name.as_str()) {
                (true, "int") => TypeKind::Int,
                (true, "bool") => TypeKind::Bool,
                (true, "void") => TypeKind::Void,
                (false, "str") => TypeKind::Str,
                (true, _) => TypeKind::Struct,
                (false, _) => TypeKind::Class,
            }
        } else if is_struct {
            TypeKind::Struct
        } else {
            TypeKind::Class
        };

        let generic_parameters = self.annotate_generics(tree, node_scope, &generics);
        let container_scope = self.ctx.scopes.create(None);
        let ty = self.ctx.symbols.alloc_type(TypeData {
            kind,
            owner: parent,
            name: name.clone(),
            location: location.clone(),
            scope: container_scope,
            members: Vec::new(),
            generic_parameters,
            generic_arguments: Vec::new(),
            definition: None,
        });
        self.node_symbols.insert(node, Declared::Type(ty));
        self.bind_member(scope, &name, MemberId::Type(ty), parent, &location);

        self.declare_children(tree, &members, node_scope, Owner::Type(ty));
    }

    fn declare_function(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId, parent: Owner) {
        let Node::Function(decl) = tree.node(node) else {
            return;
        };
        let name = decl.tok_name.text.clone();
        let generics = decl.generics.clone();
        let parameter_nodes = decl.parameters.items.clone();
        let return_type_node = decl.return_type;
        let attribute_node = decl.attributes;
        let location = self.location(node);
        let fn_scope = self.scope_of(node);

        let generic_parameters = self.annotate_generics(tree, fn_scope, &generics);
        let attributes = self.annotate_attributes(tree, attribute_node);

        // An untyped first parameter of a method takes the owner's type
        let mut param_types = Vec::with_capacity(parameter_nodes.len());
        for (index, &param) in parameter_nodes.iter().enumerate() {
            let Node::Parameter(param_node) = tree.node(param) else {
                continue;
            };
            let is_auto = matches!(tree.node(param_node.param_type), Node::AutoType(_));
            let ty = match (index, is_auto, parent) {
                (0, true, Owner::Type(owner_type)) => owner_type,
                _ => self.resolve_type(tree, param_node.param_type),
            };
            param_types.push(ty);
        }

        // An omitted return type means void
        let return_type = if matches!(tree.node(return_type_node), Node::AutoType(_)) {
            self.ctx.void_type()
        } else {
            self.resolve_type(tree, return_type_node)
        };

        let fn_type_scope = self.ctx.scopes.create(None);
        let fn_type = self.ctx.symbols.alloc_type(TypeData::function(
            Owner::Module(self.module),
            param_types.clone(),
            return_type,
            location.clone(),
            fn_type_scope,
        ));
        let func = self.ctx.symbols.alloc_function(FunctionData {
            owner: parent,
            name: name.clone(),
            fn_type,
            parameters: Vec::new(),
            variables: Vec::new(),
            body: None,
            generic_parameters,
            generic_arguments: Vec::new(),
            definition: None,
            attributes,
            location: location.clone(),
        });

        for (&param, &ty) in parameter_nodes.iter().zip(&param_types) {
            let Node::Parameter(param_node) = tree.node(param) else {
                continue;
            };
            let param_name = param_node.tok_name.text.clone();
            let param_location = self.location(param);
            let param_id = self.ctx.symbols.alloc_parameter(ParameterData {
                owner: func,
                name: param_name.clone(),
                ty,
                location: param_location.clone(),
            });
            self.ctx.symbols.function_mut(func).parameters.push(param_id);
            self.node_symbols.insert(param, Declared::Parameter(param_id));
            if self
                .ctx
                .scopes
                .append(fn_scope, &param_name, Binding::Parameter(param_id))
                .is_err()
            {
                self.error(
                    format!("already defined symbol with name '{}'", param_name),
                    param_location,
                );
            }
        }

        self.node_symbols.insert(node, Declared::Function(func));
        self.bind_member(scope, &name, MemberId::Function(func), parent, &location);
        self.declared_functions.push((node, func));
    }

    fn declare_field(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId, parent: Owner) {
        let Node::Field(decl) = tree.node(node) else {
            return;
        };
        let name = decl.tok_name.text.clone();
        let field_type = decl.field_type;
        let location = self.location(node);

        let Owner::Type(owner_type) = parent else {
            self.error("field must be declared in a type", location);
            return;
        };

        let ty = self.resolve_type(tree, field_type);
        let field = self.ctx.symbols.alloc_field(FieldData {
            owner: owner_type,
            name: name.clone(),
            ty,
            location: location.clone(),
        });
        self.node_symbols.insert(node, Declared::Field(field));
        self.bind_member(scope, &name, MemberId::Field(field), parent, &location);
    }

    /// Bind a member's name into the enclosing lexical scope and into its
    /// container's own scope; duplicates are reported once
    fn bind_member(
        &mut self,
        scope: ScopeId,
        name: &str,
        member: MemberId,
        parent: Owner,
        location: &Location,
    ) {
        let lexical = match member {
            MemberId::Type(ty) => self.ctx.scopes.append(scope, name, Binding::Type(ty)),
            MemberId::Function(func) => self.ctx.scopes.append_function(scope, name, func),
            MemberId::Field(field) => self.ctx.scopes.append(scope, name, Binding::Field(field)),
        };
        let container = self.ctx.symbols.add_member(parent, member, &mut self.ctx.scopes);
        if lexical.is_err() || container.is_err() {
            self.error(
                format!("already defined symbol with name '{}'", name),
                location.clone(),
            );
        }
    }

    /// Bind type-parameter placeholders into the declaration's scope
    fn annotate_generics(
        &mut self,
        tree: &SyntaxTree,
        scope: ScopeId,
        generics: &Option<crate::cst::GenericParamList>,
    ) -> Vec<TypeId> {
        let Some(generics) = generics else {
            return Vec::new();
        };
        let mut parameters = Vec::new();
        for &param in &generics.parameters.items {
            let Node::GenericParameter(node) = tree.node(param) else {
                continue;
            };
            let name = node.tok_name.text.clone();
            let location = self.location(param);
            let placeholder_scope = self.ctx.scopes.create(None);
            let ty = self.ctx.symbols.alloc_type(TypeData::primitive(
                TypeKind::Generic,
                Owner::Module(self.module),
                name.clone(),
                location.clone(),
                placeholder_scope,
            ));
            self.node_symbols.insert(param, Declared::Type(ty));
            if self
                .ctx
                .scopes
                .append(scope, &name, Binding::Type(ty))
                .is_err()
            {
                self.error(
                    format!("already defined symbol with name '{}'", name),
                    location,
                );
            }
            parameters.push(ty);
        }
        parameters
    }

    /// Evaluate member attributes; arguments must be constants
    fn annotate_attributes(&mut self, tree: &SyntaxTree, list: Option<NodeId>) -> Vec<Attribute> {
        let Some(list) = list else {
            return Vec::new();
        };
        let Node::AttributeList(attr_list) = tree.node(list) else {
            return Vec::new();
        };
        let items = attr_list.attributes.items.clone();

        let mut attributes = Vec::new();
        for attr_id in items {
            let Node::Attribute(attr) = tree.node(attr_id) else {
                continue;
            };
            let name = attr.tok_name.text.clone();
            let argument_nodes = attr.arguments.items.clone();
            let location = self.location(attr_id);
            let arguments = argument_nodes
                .into_iter()
                .map(|arg| self.constant_value(tree, arg))
                .collect();
            attributes.push(Attribute {
                name,
                arguments,
                location,
            });
        }
        attributes
    }

    fn constant_value(&mut self, tree: &SyntaxTree, node: NodeId) -> Value {
        let location = self.location(node);
        match tree.node(node) {
            Node::IntLiteral(literal) => match literal.value() {
                Some(value) => {
                    let ty = self.ctx.integer_type();
                    Value::Integer {
                        ty,
                        value,
                        location,
                    }
                }
                None => {
                    self.error("integer literal out of range", location.clone());
                    self.ctx.error_value(location)
                }
            },
            Node::StrLiteral(literal) => {
                let value = literal.value();
                let ty = self.ctx.string_type();
                Value::Str {
                    ty,
                    value,
                    location,
                }
            }
            Node::NameExpr(name) if name.tok_name.text == "True" => {
                let ty = self.ctx.boolean_type();
                Value::Boolean {
                    ty,
                    value: true,
                    location,
                }
            }
            Node::NameExpr(name) if name.tok_name.text == "False" => {
                let ty = self.ctx.boolean_type();
                Value::Boolean {
                    ty,
                    value: false,
                    location,
                }
            }
            _ => {
                self.error("attribute arguments must be constant expressions", location.clone());
                self.ctx.error_value(location)
            }
        }
    }

    // =========================================================================
    // Type resolution
    // =========================================================================

    fn resolve_type(&mut self, tree: &SyntaxTree, node: NodeId) -> TypeId {
        let location = self.location(node);
        match tree.node(node) {
            Node::NamedType(named) => {
                let name = named.tok_name.text.clone();
                match name.as_str() {
                    "void" => return self.ctx.void_type(),
                    "bool" => return self.ctx.boolean_type(),
                    "int" => return self.ctx.integer_type(),
                    _ => {}
                }
                let scope = self.scope_of(node);
                match self.ctx.scopes.resolve(scope, &name) {
                    Some(Binding::Type(ty)) => ty,
                    Some(_) => {
                        self.error(format!("'{}' is not a type", name), location.clone());
                        self.ctx.error_type(location)
                    }
                    None => {
                        self.error(
                            format!("cannot find symbol '{}' in current scope", name),
                            location.clone(),
                        );
                        self.ctx.error_type(location)
                    }
                }
            }
            Node::ParameterizedType(parameterized) => {
                let argument_nodes = parameterized.arguments.items.clone();
                let base = self.resolve_type(tree, parameterized.base);
                let arguments: Vec<TypeId> = argument_nodes
                    .into_iter()
                    .map(|arg| self.resolve_type(tree, arg))
                    .collect();
                if self.ctx.symbols.is_error_type(base)
                    || arguments.iter().any(|&a| self.ctx.symbols.is_error_type(a))
                {
                    return self.ctx.error_type(location);
                }
                self.instantiate_type_reported(base, arguments, location)
            }
            Node::AutoType(_) => {
                self.error("missing type annotation", location.clone());
                self.ctx.error_type(location)
            }
            _ => {
                self.error("expected a type", location.clone());
                self.ctx.error_type(location)
            }
        }
    }

    /// Instantiate with diagnostics on user-level failure
    fn instantiate_type_reported(
        &mut self,
        generic: TypeId,
        arguments: Vec<TypeId>,
        location: Location,
    ) -> TypeId {
        let mut instantiator =
            Instantiator::new(&mut self.ctx.symbols, &mut self.ctx.scopes, self.module);
        match instantiator.instantiate_type(generic, arguments) {
            Ok(instance) => instance,
            Err(error @ InstantiateError::Internal(_)) => {
                self.internal_error.get_or_insert(error);
                self.ctx.error_type(location)
            }
            Err(error) => {
                self.error(error.to_string(), location.clone());
                self.ctx.error_type(location)
            }
        }
    }

    // =========================================================================
    // Pass 4: body emission
    // =========================================================================

    fn emit_functions(&mut self) {
        let tree = Rc::clone(&self.tree);
        let declared = self.declared_functions.clone();
        for (node, func) in declared {
            if self.internal_error.is_some() {
                return;
            }
            let Node::Function(decl) = tree.node(node) else {
                continue;
            };
            if let FunctionBody::Block { block, .. } = &decl.body {
                let block = *block;
                self.function_stack.push(func);
                let body = self.emit_statement(&tree, block);
                self.function_stack.pop();
                self.ctx.symbols.function_mut(func).body = Some(body);
            }
        }
    }

    /// The innermost function currently being emitted
    fn current_function(&self) -> FuncId {
        *self
            .function_stack
            .last()
            .expect("body emission outside of a function")
    }

    fn emit_statement(&mut self, tree: &SyntaxTree, node: NodeId) -> Statement {
        let location = self.location(node);
        match tree.node(node) {
            Node::Block(block) => {
                let statement_nodes = block.statements.clone();
                let statements = statement_nodes
                    .into_iter()
                    .map(|stmt| self.emit_statement(tree, stmt))
                    .collect();
                Statement::Block {
                    statements,
                    location,
                }
            }
            Node::PassStmt(_) => Statement::Pass { location },
            Node::Else(clause) => self.emit_statement(tree, clause.block),
            Node::ReturnStmt(ret) => {
                let value = ret.value.map(|value| self.emit_value(tree, value));
                self.check_return_type(&value, &location);
                Statement::Return { value, location }
            }
            Node::ExprStmt(stmt) => {
                let value = self.emit_value(tree, stmt.value);
                Statement::Expression { value }
            }
            Node::ConditionStmt(cond) => {
                let condition_node = cond.condition;
                let then_node = cond.then_block;
                let else_node = cond.else_clause;
                let condition = self.emit_value(tree, condition_node);
                self.check_condition_type(&condition);
                let then_statement = Box::new(self.emit_statement(tree, then_node));
                let else_statement =
                    else_node.map(|clause| Box::new(self.emit_statement(tree, clause)));
                Statement::Condition {
                    condition,
                    then_statement,
                    else_statement,
                    location,
                }
            }
            Node::WhileStmt(stmt) => {
                let condition_node = stmt.condition;
                let then_node = stmt.then_block;
                let else_node = stmt.else_clause;
                let condition = self.emit_value(tree, condition_node);
                self.check_condition_type(&condition);
                let then_statement = Box::new(self.emit_statement(tree, then_node));
                let else_statement =
                    else_node.map(|clause| Box::new(self.emit_statement(tree, clause)));
                Statement::While {
                    condition,
                    then_statement,
                    else_statement,
                    location,
                }
            }
            Node::AssignStmt(assign) => {
                let target_node = assign.target;
                let value_node = assign.value;
                let source = self.emit_value(tree, value_node);
                self.emit_assignment(tree, target_node, source, location)
            }
            Node::EllipsisStmt(_) => Statement::Pass { location },
            _ => {
                self.error("unsupported statement", location.clone());
                Statement::Pass { location }
            }
        }
    }

    fn check_condition_type(&mut self, condition: &Value) {
        let bool_type = self.ctx.boolean_type();
        let ty = condition.ty();
        if self.ctx.symbols.is_error_type(ty) {
            return;
        }
        if !self.ctx.symbols.types_equal(ty, bool_type) {
            let display = self.ctx.symbols.type_display(ty);
            self.error(
                format!(
                    "Condition expression for statement must have 'bool' type, got '{}'",
                    display
                ),
                condition.location().clone(),
            );
        }
    }

    fn check_return_type(&mut self, value: &Option<Value>, location: &Location) {
        let return_type = self.ctx.symbols.return_type(self.current_function());
        if self.ctx.symbols.is_error_type(return_type) {
            return;
        }
        match value {
            Some(value) => {
                let ty = value.ty();
                if self.ctx.symbols.is_error_type(ty) {
                    return;
                }
                if !self.ctx.symbols.types_equal(ty, return_type) {
                    let expected = self.ctx.symbols.type_display(return_type);
                    let got = self.ctx.symbols.type_display(ty);
                    self.error(
                        format!(
                            "Return statement value must have '{}' type, got '{}'",
                            expected, got
                        ),
                        location.clone(),
                    );
                }
            }
            None => {
                let void_type = self.ctx.void_type();
                if !self.ctx.symbols.types_equal(void_type, return_type) {
                    let expected = self.ctx.symbols.type_display(return_type);
                    self.error(
                        format!(
                            "Return statement value must have '{}' type, got 'void'",
                            expected
                        ),
                        location.clone(),
                    );
                }
            }
        }
    }

    fn emit_assignment(
        &mut self,
        tree: &SyntaxTree,
        target_node: NodeId,
        source: Value,
        location: Location,
    ) -> Statement {
        let target = match tree.node(target_node) {
            Node::NameExpr(name_expr) => {
                let name = name_expr.tok_name.text.clone();
                let target_location = self.location(target_node);
                match self.lookup_symbol(tree, target_node) {
                    Ok(Resolved::Value(value)) if value.is_target() || value.is_error() => value,
                    _ => {
                        // First assignment introduces a local variable of
                        // the source's type
                        let variable = self.ctx.symbols.alloc_variable(VariableData {
                            name: name.clone(),
                            ty: source.ty(),
                            location: target_location.clone(),
                        });
                        let func = self.current_function();
                        self.ctx.symbols.function_mut(func).variables.push(variable);
                        let scope = self.scope_of(target_node);
                        let _ = self
                            .ctx
                            .scopes
                            .append(scope, &name, Binding::Variable(variable));
                        Value::Variable {
                            variable,
                            ty: source.ty(),
                            location: target_location,
                        }
                    }
                }
            }
            Node::AttrExpr(_) => {
                let value = self.emit_value(tree, target_node);
                if !value.is_error() && !value.is_target() {
                    self.error("cannot assign to this expression", self.location(target_node));
                }
                value
            }
            _ => {
                let target_location = self.location(target_node);
                self.error("cannot assign to this expression", target_location.clone());
                self.ctx.error_value(target_location)
            }
        };

        let target_ty = target.ty();
        let source_ty = source.ty();
        if !self.ctx.symbols.is_error_type(target_ty)
            && !self.ctx.symbols.is_error_type(source_ty)
            && !self.ctx.symbols.types_equal(target_ty, source_ty)
        {
            let source_display = self.ctx.symbols.type_display(source_ty);
            let target_display = self.ctx.symbols.type_display(target_ty);
            self.error(
                format!(
                    "cannot assign value of type '{}' to target of type '{}'",
                    source_display, target_display
                ),
                location.clone(),
            );
        }

        Statement::Assign {
            target,
            source,
            location,
        }
    }

    // =========================================================================
    // Expression lowering
    // =========================================================================

    fn emit_value(&mut self, tree: &SyntaxTree, node: NodeId) -> Value {
        let location = self.location(node);
        match tree.node(node) {
            Node::IntLiteral(_) | Node::StrLiteral(_) => match self.lookup_symbol(tree, node) {
                Ok(Resolved::Value(value)) => value,
                _ => self.ctx.error_value(location),
            },
            Node::NameExpr(_) | Node::AttrExpr(_) | Node::SubscriptExpr(_) => {
                match self.lookup_symbol(tree, node) {
                    Ok(Resolved::Value(value)) => value,
                    Ok(_) => {
                        self.error("expected a value expression", location.clone());
                        self.ctx.error_value(location)
                    }
                    Err(miss) => {
                        self.error(miss.message, miss.location);
                        self.ctx.error_value(location)
                    }
                }
            }
            Node::ParenExpr(paren) => self.emit_value(tree, paren.value),
            Node::CallExpr(_) => self.emit_call(tree, node),
            Node::UnaryExpr(unary) => {
                let operand_node = unary.operand;
                let op: UnaryOp = unary.op;
                let operand = self.emit_value(tree, operand_node);
                if self.ctx.symbols.is_error_type(operand.ty()) {
                    return self.ctx.error_value(location);
                }
                let scope = self.scope_of(node);
                self.resolve_function_call(scope, op.dunder(), vec![operand], location)
            }
            Node::BinaryExpr(binary) => {
                let left_node = binary.left;
                let right_node = binary.right;
                let op_text = binary.tok_op.text.clone();
                let dunder = binary.op.dunder();
                let left = self.emit_value(tree, left_node);
                let right = self.emit_value(tree, right_node);
                if self.ctx.symbols.is_error_type(left.ty())
                    || self.ctx.symbols.is_error_type(right.ty())
                {
                    return self.ctx.error_value(location);
                }
                let Some(dunder) = dunder else {
                    self.error(
                        format!("binary operator '{}' is not supported", op_text),
                        location.clone(),
                    );
                    return self.ctx.error_value(location);
                };
                let scope = self.scope_of(node);
                self.resolve_function_call(scope, dunder, vec![left, right], location)
            }
            _ => {
                self.error("expected a value expression", location.clone());
                self.ctx.error_value(location)
            }
        }
    }

    fn emit_call(&mut self, tree: &SyntaxTree, node: NodeId) -> Value {
        let Node::CallExpr(call) = tree.node(node) else {
            return self.ctx.error_value(self.location(node));
        };
        let location = self.location(node);
        let argument_nodes = call.arguments.items.clone();
        let callee = unwrap_paren(tree, call.callee);

        let arguments: Vec<Value> = argument_nodes
            .into_iter()
            .map(|arg| self.emit_value(tree, arg))
            .collect();
        if arguments
            .iter()
            .any(|arg| self.ctx.symbols.is_error_type(arg.ty()))
        {
            return self.ctx.error_value(location);
        }

        // `a.m(b)` resolves `m` as a method or uniform call with `a`
        // prepended to the arguments
        if let Node::AttrExpr(attr) = tree.node(callee) {
            let instance_node = attr.value;
            let name = attr.tok_name.text.clone();
            let instance = self.emit_value(tree, instance_node);
            if self.ctx.symbols.is_error_type(instance.ty()) {
                return self.ctx.error_value(location);
            }
            let member_scope = self.ctx.symbols.ty(instance.ty()).scope;
            if let Some(Binding::Field(_)) = self.ctx.scopes.resolve(member_scope, &name) {
                self.error(format!("field '{}' is not callable", name), location.clone());
                return self.ctx.error_value(location);
            }
            let mut full_arguments = vec![instance];
            full_arguments.extend(arguments);
            let scope = self.scope_of(node);
            return self.resolve_function_call(scope, &name, full_arguments, location);
        }

        match self.lookup_symbol(tree, callee) {
            Ok(Resolved::Overload(overload)) => {
                let scope = self.scope_of(node);
                let name = overload.name.clone();
                self.resolve_function_call(scope, &name, arguments, location)
            }
            Ok(Resolved::Type(ty)) => {
                if self.ctx.symbols.is_error_type(ty) {
                    return self.ctx.error_value(location);
                }
                Value::New {
                    ty,
                    arguments,
                    location,
                }
            }
            Ok(Resolved::Value(value)) if value.is_error() => self.ctx.error_value(location),
            Ok(_) => {
                self.error("expression is not callable", location.clone());
                self.ctx.error_value(location)
            }
            Err(miss) => {
                // Unresolved bare name: retry as a free-function call
                if let Node::NameExpr(name_expr) = tree.node(callee) {
                    if name_expr.tok_name.kind == TokenKind::Name {
                        let name = name_expr.tok_name.text.clone();
                        let scope = self.scope_of(node);
                        return self.resolve_function_call(scope, &name, arguments, location);
                    }
                }
                self.error(miss.message, miss.location);
                self.ctx.error_value(location)
            }
        }
    }

    // =========================================================================
    // Symbol lookup
    // =========================================================================

    fn lookup_symbol(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<Resolved, LookupMiss> {
        let location = self.location(node);
        match tree.node(node) {
            Node::IntLiteral(literal) => {
                let literal = literal.clone();
                match literal.value() {
                    Some(value) => {
                        let ty = self.ctx.integer_type();
                        Ok(Resolved::Value(Value::Integer {
                            ty,
                            value,
                            location,
                        }))
                    }
                    None => {
                        self.error("integer literal out of range", location.clone());
                        Ok(Resolved::Value(self.ctx.error_value(location)))
                    }
                }
            }
            Node::StrLiteral(literal) => {
                let value = literal.value();
                let ty = self.ctx.string_type();
                Ok(Resolved::Value(Value::Str {
                    ty,
                    value,
                    location,
                }))
            }
            Node::NameExpr(name_expr) => {
                // Error tokens from parser recovery resolve to poison
                if name_expr.tok_name.kind != TokenKind::Name {
                    return Ok(Resolved::Value(self.ctx.error_value(location)));
                }
                let name = name_expr.tok_name.text.clone();
                match name.as_str() {
                    "True" | "False" => {
                        let ty = self.ctx.boolean_type();
                        return Ok(Resolved::Value(Value::Boolean {
                            ty,
                            value: name == "True",
                            location,
                        }));
                    }
                    "void" => return Ok(Resolved::Type(self.ctx.void_type())),
                    "bool" => return Ok(Resolved::Type(self.ctx.boolean_type())),
                    "int" => return Ok(Resolved::Type(self.ctx.integer_type())),
                    _ => {}
                }
                let scope = self.scope_of(node);
                match self.ctx.scopes.resolve(scope, &name) {
                    Some(binding) => Ok(self.resolved_from_binding(binding, location)),
                    None => Err(LookupMiss {
                        message: format!("cannot find symbol '{}' in current scope", name),
                        location,
                    }),
                }
            }
            Node::AttrExpr(attr) => {
                let instance_node = attr.value;
                let name = attr.tok_name.text.clone();
                let instance = self.emit_value(tree, instance_node);
                let instance_ty = instance.ty();
                if self.ctx.symbols.is_error_type(instance_ty) {
                    return Ok(Resolved::Value(self.ctx.error_value(location)));
                }
                let member_scope = self.ctx.symbols.ty(instance_ty).scope;
                match self.ctx.scopes.resolve(member_scope, &name) {
                    Some(Binding::Field(field)) => {
                        let field_ty = self.ctx.symbols.field(field).ty;
                        Ok(Resolved::Value(Value::BoundedField {
                            instance: Box::new(instance),
                            field,
                            ty: field_ty,
                            location,
                        }))
                    }
                    Some(binding) => Ok(self.resolved_from_binding(binding, location)),
                    None => {
                        let display = self.ctx.symbols.type_display(instance_ty);
                        Err(LookupMiss {
                            message: format!(
                                "cannot find symbol '{}' in type '{}'",
                                name, display
                            ),
                            location,
                        })
                    }
                }
            }
            Node::SubscriptExpr(subscript) => {
                let base_node = subscript.callee;
                let argument_nodes = subscript.arguments.items.clone();
                let base = self.lookup_symbol(tree, base_node)?;
                let arguments: Vec<TypeId> = argument_nodes
                    .into_iter()
                    .map(|arg| self.type_argument(tree, arg))
                    .collect();
                match base {
                    Resolved::Type(base_ty) => {
                        if self.ctx.symbols.is_error_type(base_ty)
                            || arguments.iter().any(|&a| self.ctx.symbols.is_error_type(a))
                        {
                            return Ok(Resolved::Type(self.ctx.error_type(location)));
                        }
                        let instance =
                            self.instantiate_type_reported(base_ty, arguments, location);
                        Ok(Resolved::Type(instance))
                    }
                    Resolved::Value(value) if value.is_error() => Ok(Resolved::Value(value)),
                    _ => {
                        self.error("only types take type arguments", location.clone());
                        Ok(Resolved::Type(self.ctx.error_type(location)))
                    }
                }
            }
            Node::ParenExpr(paren) => self.lookup_symbol(tree, paren.value),
            _ => Err(LookupMiss {
                message: "expression is not a symbol".to_string(),
                location,
            }),
        }
    }

    fn resolved_from_binding(&mut self, binding: Binding, location: Location) -> Resolved {
        match binding {
            Binding::Type(ty) => Resolved::Type(ty),
            Binding::Overload(overload) => Resolved::Overload(overload),
            Binding::Module(module) => Resolved::Module(module),
            Binding::Field(field) => Resolved::Field(field),
            Binding::Parameter(parameter) => {
                let ty = self.ctx.symbols.parameter(parameter).ty;
                Resolved::Value(Value::Parameter {
                    parameter,
                    ty,
                    location,
                })
            }
            Binding::Variable(variable) => {
                let ty = self.ctx.symbols.variable(variable).ty;
                Resolved::Value(Value::Variable {
                    variable,
                    ty,
                    location,
                })
            }
        }
    }

    /// Resolve a subscript argument expression as a type
    fn type_argument(&mut self, tree: &SyntaxTree, node: NodeId) -> TypeId {
        let location = self.location(node);
        match self.lookup_symbol(tree, node) {
            Ok(Resolved::Type(ty)) => ty,
            Ok(Resolved::Value(value)) if value.is_error() => self.ctx.error_type(location),
            Ok(_) => {
                self.error("expected a type argument", location.clone());
                self.ctx.error_type(location)
            }
            Err(miss) => {
                self.error(miss.message, miss.location);
                self.ctx.error_type(location)
            }
        }
    }

    // =========================================================================
    // Overload resolution
    // =========================================================================

    fn resolve_function_call(
        &mut self,
        scope: ScopeId,
        name: &str,
        arguments: Vec<Value>,
        location: Location,
    ) -> Value {
        match self.find_function(scope, name, &arguments) {
            Some(function) => {
                let ty = self.ctx.symbols.return_type(function);
                Value::Call {
                    function,
                    arguments,
                    ty,
                    location,
                }
            }
            None => {
                let types = arguments
                    .iter()
                    .map(|arg| self.ctx.symbols.type_display(arg.ty()))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.error(
                    format!("cannot find function '{}({})' in current scope", name, types),
                    location.clone(),
                );
                self.ctx.error_value(location)
            }
        }
    }

    /// Candidates come from the lexical scope and from the first
    /// argument's type scope. A min-heap ranks (priority, insertion);
    /// all candidates tied at the lowest priority are retained and the
    /// first among them wins. Generic matches rank at -1 and therefore
    /// outrank every non-generic match.
    fn find_function(&mut self, scope: ScopeId, name: &str, arguments: &[Value]) -> Option<FuncId> {
        let mut candidates: Vec<FuncId> = Vec::new();
        if let Some(Binding::Overload(overload)) = self.ctx.scopes.resolve(scope, name) {
            candidates.extend(overload.functions);
        }
        if let Some(first) = arguments.first() {
            let type_scope = self.ctx.symbols.ty(first.ty()).scope;
            if let Some(Binding::Overload(overload)) = self.ctx.scopes.resolve(type_scope, name) {
                for function in overload.functions {
                    if !candidates.contains(&function) {
                        candidates.push(function);
                    }
                }
            }
        }

        let mut heap = BinaryHeap::new();
        for (index, function) in candidates.into_iter().enumerate() {
            if let Some((priority, instance)) = self.check_function(function, arguments) {
                heap.push(Reverse((priority, index, instance)));
            }
        }

        let mut best: Vec<FuncId> = Vec::new();
        let mut best_priority: Option<i64> = None;
        while let Some(Reverse((priority, _, function))) = heap.pop() {
            match best_priority {
                Some(current) if current != priority => break,
                _ => {
                    best_priority = Some(priority);
                    best.push(function);
                }
            }
        }
        best.first().copied()
    }

    fn check_function(&mut self, function: FuncId, arguments: &[Value]) -> Option<(i64, FuncId)> {
        if self.ctx.symbols.is_generic_function(function) {
            self.check_generic_function(function, arguments)
        } else {
            self.check_exact_function(function, arguments)
        }
    }

    /// Non-generic candidate: all parameter types must equal argument
    /// types exactly; priority is two per parameter
    fn check_exact_function(
        &mut self,
        function: FuncId,
        arguments: &[Value],
    ) -> Option<(i64, FuncId)> {
        let params = self.ctx.symbols.param_types(function);
        if params.len() != arguments.len() {
            return None;
        }
        let mut priority = 0i64;
        for (&param, argument) in params.iter().zip(arguments) {
            if !self.ctx.symbols.types_equal(param, argument.ty()) {
                return None;
            }
            priority += 2;
        }
        Some((priority, function))
    }

    /// Generic candidate: infer the type arguments by unification, then
    /// instantiate. Any inference failure rejects the candidate.
    fn check_generic_function(
        &mut self,
        function: FuncId,
        arguments: &[Value],
    ) -> Option<(i64, FuncId)> {
        let params = self.ctx.symbols.param_types(function);
        if params.len() != arguments.len() {
            return None;
        }

        let generic_parameters = self.ctx.symbols.function(function).generic_parameters.clone();
        let mut inference = Inference::new();
        let variables: Vec<_> = generic_parameters
            .iter()
            .map(|&param| inference.add_generic_parameter(param, &self.ctx.symbols))
            .collect();
        let param_terms: Vec<_> = params
            .iter()
            .map(|&param| inference.add_type(param, &self.ctx.symbols))
            .collect();
        let argument_terms: Vec<_> = arguments
            .iter()
            .map(|arg| inference.add_type(arg.ty(), &self.ctx.symbols))
            .collect();

        for (&param, &argument) in param_terms.iter().zip(&argument_terms) {
            if inference.unify(param, argument, &self.ctx.symbols).is_err() {
                return None;
            }
        }

        let mut generic_arguments = Vec::with_capacity(variables.len());
        for variable in variables {
            let concrete = inference.concrete(variable)?;
            generic_arguments.push(self.concrete_type(concrete)?);
        }

        let mut instantiator =
            Instantiator::new(&mut self.ctx.symbols, &mut self.ctx.scopes, self.module);
        match instantiator.instantiate_function(function, generic_arguments) {
            Ok(instance) => Some((-1, instance)),
            Err(error @ InstantiateError::Internal(_)) => {
                self.internal_error.get_or_insert(error);
                None
            }
            Err(_) => None,
        }
    }

    fn concrete_type(&mut self, concrete: Concrete) -> Option<TypeId> {
        match concrete {
            Concrete::Plain(ty) => Some(ty),
            Concrete::Apply(constructor, arguments) => {
                let mut resolved = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    resolved.push(self.concrete_type(argument)?);
                }
                let mut instantiator =
                    Instantiator::new(&mut self.ctx.symbols, &mut self.ctx.scopes, self.module);
                instantiator.instantiate_type(constructor, resolved).ok()
            }
        }
    }
}

fn unwrap_paren(tree: &SyntaxTree, mut node: NodeId) -> NodeId {
    while let Node::ParenExpr(paren) = tree.node(node) {
        node = paren.value;
    }
    node
}

fn type_body_members(body: &crate::cst::TypeBody) -> Vec<NodeId> {
    match body {
        crate::cst::TypeBody::Ellipsis { .. } => Vec::new(),
        crate::cst::TypeBody::Members { members, .. } => members.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::mangle::Mangler;
    use crate::semantic::symbol::GenericRef;
    use crate::workspace::MemoryWorkspace;

    fn analyze(source: &str) -> (SemanticContext<MemoryWorkspace>, ModuleId) {
        let workspace = MemoryWorkspace::new().with_module("main", source);
        let mut ctx = SemanticContext::new(workspace);
        let module = ctx.load("main").expect("module loads");
        (ctx, module)
    }

    fn assert_clean(ctx: &SemanticContext<MemoryWorkspace>) {
        assert!(
            !ctx.diagnostics.has_errors(),
            "unexpected errors: {:?}",
            ctx.diagnostics.as_slice()
        );
    }

    fn function_named(
        ctx: &SemanticContext<MemoryWorkspace>,
        module: ModuleId,
        name: &str,
    ) -> FuncId {
        ctx.symbols()
            .module(module)
            .functions
            .iter()
            .copied()
            .find(|&f| {
                ctx.symbols().function(f).name == name
                    && ctx.symbols().function(f).definition.is_none()
            })
            .unwrap_or_else(|| panic!("function '{}' not found", name))
    }

    fn body_statements<'a>(
        ctx: &'a SemanticContext<MemoryWorkspace>,
        func: FuncId,
    ) -> &'a [Statement] {
        match ctx.symbols().function(func).body.as_ref() {
            Some(Statement::Block { statements, .. }) => statements,
            other => panic!("expected block body, got {:?}", other),
        }
    }

    #[test]
    fn test_function_with_operator_body() {
        // def f(x: int) -> int: return x + 1
        let (ctx, module) = analyze("def f(x: int) -> int:\n    return x + 1\n");
        assert_clean(&ctx);

        let f = function_named(&ctx, module, "f");
        let int_type = ctx.symbols().return_type(f);
        assert!(matches!(ctx.symbols().ty(int_type).kind, TypeKind::Int));

        let statements = body_statements(&ctx, f);
        let Statement::Return {
            value: Some(Value::Call {
                function,
                arguments,
                ty,
                ..
            }),
            ..
        } = &statements[0]
        else {
            panic!("expected return of a call, got {:?}", statements[0]);
        };
        assert_eq!(ctx.symbols().function(*function).name, "__add__");
        assert!(matches!(arguments[0], Value::Parameter { .. }));
        assert!(matches!(arguments[1], Value::Integer { value: 1, .. }));
        assert!(ctx.symbols().types_equal(*ty, int_type));
    }

    #[test]
    fn test_generic_call_instantiates_once() {
        let source = "def id[T](x: T) -> T:\n    return x\n\ndef main() -> void:\n    id(1)\n";
        let (mut ctx, module) = analyze(source);
        assert_clean(&ctx);

        let id_def = function_named(&ctx, module, "id");
        let int_type = ctx.integer_type();
        let instances = &ctx.symbols().module(module).instances;
        assert_eq!(instances.len(), 1);
        let cached = instances
            .get(&(GenericRef::Function(id_def), vec![int_type]))
            .copied()
            .expect("instance cached under (id, (int,))");

        let main = function_named(&ctx, module, "main");
        let statements = body_statements(&ctx, main);
        let Statement::Expression {
            value: Value::Call { function, .. },
        } = &statements[0]
        else {
            panic!("expected call statement");
        };
        assert_eq!(GenericRef::Function(*function), cached);
        assert_eq!(ctx.symbols().function(*function).definition, Some(id_def));
        assert_eq!(ctx.symbols().param_types(*function), vec![int_type]);
    }

    #[test]
    fn test_variable_introduction_and_retyping_error() {
        let source = "def main() -> void:\n    x = 1\n    x = True\n";
        let (mut ctx, module) = analyze(source);

        assert_eq!(ctx.diagnostics.error_count(), 1);
        let message = &ctx.diagnostics.as_slice()[0].message;
        assert!(
            message.contains("cannot assign value of type 'bool'"),
            "unexpected message: {}",
            message
        );

        // The first assignment introduced an int variable
        let main = function_named(&ctx, module, "main");
        let int_type = ctx.integer_type();
        let variables = &ctx.symbols().function(main).variables;
        assert_eq!(variables.len(), 1);
        assert_eq!(ctx.symbols().variable(variables[0]).ty, int_type);
    }

    #[test]
    fn test_generic_struct_construction() {
        let source = "struct Pair[A, B]:\n    a: A\n    b: B\n\ndef make() -> void:\n    Pair[int, bool]()\n";
        let (mut ctx, module) = analyze(source);
        assert_clean(&ctx);

        let make = function_named(&ctx, module, "make");
        let statements = body_statements(&ctx, make);
        let Statement::Expression {
            value: Value::New { ty, .. },
        } = &statements[0]
        else {
            panic!("expected new instruction");
        };
        let ty = *ty;

        let int_type = ctx.integer_type();
        let bool_type = ctx.boolean_type();
        let data = ctx.symbols().ty(ty);
        assert_eq!(data.generic_arguments, vec![int_type, bool_type]);
        assert!(data.definition.is_some());

        let fields: Vec<_> = data
            .members
            .iter()
            .filter_map(|m| match m {
                MemberId::Field(f) => Some(*f),
                _ => None,
            })
            .collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(ctx.symbols().field(fields[0]).ty, int_type);
        assert_eq!(ctx.symbols().field(fields[1]).ty, bool_type);

        // The instance is cached under (Pair, (int, bool))
        let pair = ctx
            .symbols()
            .module(module)
            .members
            .iter()
            .find_map(|m| match m {
                MemberId::Type(t) => Some(*t),
                _ => None,
            })
            .expect("Pair declared");
        assert_eq!(
            ctx.symbols()
                .find_instance(module, &(GenericRef::Type(pair), vec![int_type, bool_type])),
            Some(GenericRef::Type(ty))
        );
    }

    #[test]
    fn test_condition_requires_bool() {
        let source = "def main() -> void:\n    if 1:\n        pass\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        let message = &ctx.diagnostics.as_slice()[0].message;
        assert_eq!(
            message,
            "Condition expression for statement must have 'bool' type, got 'int'"
        );
    }

    #[test]
    fn test_unary_negation_lowering() {
        let source = "from __builtins__ import int\n\ndef f(x: int) -> int:\n    return -x\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let f = function_named(&ctx, module, "f");
        let statements = body_statements(&ctx, f);
        let Statement::Return {
            value: Some(Value::Call {
                function,
                arguments,
                ..
            }),
            ..
        } = &statements[0]
        else {
            panic!("expected return of a call");
        };
        assert_eq!(ctx.symbols().function(*function).name, "__neg__");
        assert_eq!(arguments.len(), 1);
        assert!(matches!(arguments[0], Value::Parameter { .. }));
    }

    #[test]
    fn test_generic_candidate_outranks_exact() {
        // Documented ranking policy: generic matches enter the heap at -1
        // and the min-heap prefers them over every non-generic match.
        let source = "def pick[T](x: T) -> T:\n    return x\n\ndef pick(x: int) -> int:\n    return x\n\ndef main() -> void:\n    pick(1)\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let main = function_named(&ctx, module, "main");
        let statements = body_statements(&ctx, main);
        let Statement::Expression {
            value: Value::Call { function, .. },
        } = &statements[0]
        else {
            panic!("expected call");
        };
        let called = ctx.symbols().function(*function);
        assert!(
            called.definition.is_some(),
            "the generic instantiation must win over the exact match"
        );
    }

    #[test]
    fn test_uniform_call_dispatch() {
        let source = "struct Point:\n    x: int\n\ndef shift(p: Point, d: int) -> int:\n    return d\n\ndef main() -> void:\n    p = Point()\n    p.shift(1)\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let main = function_named(&ctx, module, "main");
        let statements = body_statements(&ctx, main);
        let Statement::Expression {
            value: Value::Call {
                function,
                arguments,
                ..
            },
        } = &statements[1]
        else {
            panic!("expected call statement");
        };
        assert_eq!(ctx.symbols().function(*function).name, "shift");
        assert_eq!(arguments.len(), 2);
        assert!(matches!(arguments[0], Value::Variable { .. }));
    }

    #[test]
    fn test_field_access_and_assignment() {
        let source = "struct Point:\n    x: int\n\ndef get(p: Point) -> int:\n    p.x = 1\n    return p.x\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let get = function_named(&ctx, module, "get");
        let statements = body_statements(&ctx, get);
        let Statement::Assign { target, source, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(target, Value::BoundedField { .. }));
        assert!(matches!(source, Value::Integer { value: 1, .. }));

        let Statement::Return {
            value: Some(Value::BoundedField { instance, .. }),
            ..
        } = &statements[1]
        else {
            panic!("expected return of a field access");
        };
        assert!(matches!(**instance, Value::Parameter { .. }));
    }

    #[test]
    fn test_duplicate_definition_reported() {
        let source = "struct A: ...\nstruct A: ...\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert!(ctx.diagnostics.as_slice()[0]
            .message
            .contains("already defined symbol with name 'A'"));
    }

    #[test]
    fn test_unresolved_name_poisons_once() {
        // The unknown name reports once; the enclosing call does not add a
        // second diagnostic on the poisoned operand.
        let source = "def main() -> void:\n    x = missing + 1\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert!(ctx.diagnostics.as_slice()[0]
            .message
            .contains("cannot find symbol 'missing'"));
    }

    #[test]
    fn test_return_type_mismatch() {
        let source = "def f(x: bool) -> int:\n    return x\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert_eq!(
            ctx.diagnostics.as_slice()[0].message,
            "Return statement value must have 'int' type, got 'bool'"
        );
    }

    #[test]
    fn test_return_without_value_requires_void() {
        let source = "def f(x: int) -> int:\n    return\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert_eq!(
            ctx.diagnostics.as_slice()[0].message,
            "Return statement value must have 'int' type, got 'void'"
        );
    }

    #[test]
    fn test_implicit_self_parameter() {
        let source = "struct Counter:\n    value: int\n\n    def bump(self, by: int) -> int:\n        return by\n\ndef main() -> void:\n    c = Counter()\n    c.bump(2)\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        // `self` took the owner's type
        let counter = ctx
            .symbols()
            .module(module)
            .members
            .iter()
            .find_map(|m| match m {
                MemberId::Type(t) => Some(*t),
                _ => None,
            })
            .expect("Counter declared");
        let bump = ctx
            .symbols()
            .ty(counter)
            .members
            .iter()
            .find_map(|m| match m {
                MemberId::Function(f) => Some(*f),
                _ => None,
            })
            .expect("method declared");
        assert_eq!(ctx.symbols().param_types(bump)[0], counter);

        // and the method call dispatched through the type's scope
        let main = function_named(&ctx, module, "main");
        let statements = body_statements(&ctx, main);
        let Statement::Expression {
            value: Value::Call { function, .. },
        } = &statements[1]
        else {
            panic!("expected call");
        };
        assert_eq!(*function, bump);
    }

    #[test]
    fn test_scope_nesting_property() {
        // Every resolved reference's defining scope is an ancestor of (or
        // equal to) the referencing scope.
        let source = "def f(x: int) -> int:\n    if True:\n        return x\n    return x\n";
        let (ctx, _) = analyze(source);
        assert_clean(&ctx);

        let model = ctx.model("memory:main").expect("model present");
        let tree = Rc::clone(&model.tree);
        let function_node = (0..tree.len() as u32)
            .map(NodeId)
            .find(|&id| matches!(tree.node(id), Node::Function(_)))
            .expect("function node");
        let function_scope = model.node_scopes[&function_node];

        for id in (0..tree.len() as u32).map(NodeId) {
            if let Node::NameExpr(name) = tree.node(id) {
                if name.tok_name.text == "x" {
                    let use_scope = model.node_scopes[&id];
                    assert!(
                        ctx.scopes().is_nested_in(use_scope, function_scope),
                        "the use of 'x' must sit inside the defining function scope"
                    );
                }
            }
        }
    }

    #[test]
    fn test_mangled_names_end_to_end() {
        let source = "[[native(\"foo\")]]\ndef ext(x: int) -> int: ...\n\n[[native]]\ndef raw(x: int) -> int: ...\n\ndef plain(x: int) -> int:\n    return x\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let mut mangler = Mangler::new(ctx.symbols());
        let ext = function_named(&ctx, module, "ext");
        let raw = function_named(&ctx, module, "raw");
        let plain = function_named(&ctx, module, "plain");
        assert_eq!(mangler.mangle_function(ext), "foo");
        assert_eq!(mangler.mangle_function(raw), "raw");
        assert_eq!(
            mangler.mangle_function(plain),
            "ORX_FUNC_mainM::F5plainA1Pi32Ri32"
        );
    }

    #[test]
    fn test_elif_chain_lowering() {
        let source = "def f(a: bool, b: bool) -> int:\n    if a:\n        return 1\n    elif b:\n        return 2\n    else:\n        return 3\n";
        let (ctx, module) = analyze(source);
        assert_clean(&ctx);

        let f = function_named(&ctx, module, "f");
        let statements = body_statements(&ctx, f);
        let Statement::Condition {
            else_statement: Some(else_statement),
            ..
        } = &statements[0]
        else {
            panic!("expected condition with else");
        };
        // The elif became a nested condition carrying its own else
        let Statement::Condition {
            else_statement: Some(_),
            ..
        } = &**else_statement
        else {
            panic!("expected nested condition for elif");
        };
    }

    #[test]
    fn test_floor_div_has_no_operator_method() {
        let source = "def f(x: int) -> int:\n    return x // 2\n";
        let (ctx, _) = analyze(source);
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert!(ctx.diagnostics.as_slice()[0]
            .message
            .contains("binary operator '//' is not supported"));
    }

    #[test]
    fn test_import_missing_symbol() {
        let workspace = MemoryWorkspace::new()
            .with_module("lib", "def g() -> void: ...\n")
            .with_module("main", "from lib import nope\n");
        let mut ctx = SemanticContext::new(workspace);
        ctx.load("main").unwrap();
        assert_eq!(ctx.diagnostics.error_count(), 1);
        assert!(ctx.diagnostics.as_slice()[0]
            .message
            .contains("cannot find symbol 'nope' in module 'lib'"));
    }

    #[test]
    fn test_import_with_alias() {
        let workspace = MemoryWorkspace::new()
            .with_module("lib", "struct Thing:\n    n: int\n")
            .with_module(
                "main",
                "from lib import Thing as T\n\ndef f() -> void:\n    t = T()\n",
            );
        let mut ctx = SemanticContext::new(workspace);
        let module = ctx.load("main").unwrap();
        assert!(
            !ctx.diagnostics.has_errors(),
            "{:?}",
            ctx.diagnostics.as_slice()
        );

        let f = function_named(&ctx, module, "f");
        let statements = body_statements(&ctx, f);
        let Statement::Assign {
            source: Value::New { ty, .. },
            ..
        } = &statements[0]
        else {
            panic!("expected new of imported type");
        };
        assert_eq!(ctx.symbols().ty(*ty).name, "Thing");
    }
}
