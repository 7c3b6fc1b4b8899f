// Concrete syntax tree for Orcinus
//
// The CST is lossless: every token the scanner produced, including layout
// tokens and their leading trivia, is stored inside some node in source
// order. Flattening a well-formed tree therefore reproduces the original
// text byte-for-byte.
//
// Nodes live in an arena (`SyntaxTree`) and are addressed by `NodeId`, so
// later passes can attach side tables (scopes, symbols) keyed by id without
// back-pointers into the tree.

use crate::lexer::Token;
use crate::source::Location;
use serde::{Deserialize, Serialize};

/// Unique identifier of a node inside one `SyntaxTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A comma- or dot-separated list that keeps its separator tokens
#[derive(Debug, Clone, Default)]
pub struct SeparatedList<T> {
    pub items: Vec<T>,
    pub separators: Vec<Token>,
}

impl<T> SeparatedList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            separators: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

/// Unary operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Pos,
    Neg,
    Inv,
}

impl UnaryOp {
    /// The operator method this unary operator lowers to
    pub fn dunder(&self) -> &'static str {
        match self {
            UnaryOp::Pos => "__pos__",
            UnaryOp::Neg => "__neg__",
            UnaryOp::Inv => "__not__",
        }
    }
}

/// Binary operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
}

impl BinaryOp {
    /// The operator method this binary operator lowers to, if it has one
    pub fn dunder(&self) -> Option<&'static str> {
        match self {
            BinaryOp::Add => Some("__add__"),
            BinaryOp::Sub => Some("__sub__"),
            BinaryOp::Mul => Some("__mul__"),
            BinaryOp::Div => Some("__div__"),
            BinaryOp::FloorDiv | BinaryOp::Pow => None,
        }
    }
}

/// Bracketed generic parameter list: `[T, U]`
#[derive(Debug, Clone)]
pub struct GenericParamList {
    pub tok_open: Token,
    pub parameters: SeparatedList<NodeId>,
    pub tok_close: Token,
}

/// Body of a class or struct declaration
#[derive(Debug, Clone)]
pub enum TypeBody {
    /// `: ...`
    Ellipsis { tok_ellipsis: Token, tok_newline: Token },
    /// `:` newline, indented member list
    Members {
        tok_newline: Token,
        tok_indent: Token,
        members: Vec<NodeId>,
        tok_dedent: Token,
    },
}

/// Body of a function declaration
#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// `...`, a declaration without a body
    Ellipsis(NodeId),
    /// newline, indented block statement
    Block { tok_newline: Token, block: NodeId },
}

// --- Node payloads, fields in source order ---

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub imports: Vec<NodeId>,
    pub members: Vec<NodeId>,
    pub tok_eof: Token,
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub tok_import: Token,
    pub aliases: SeparatedList<NodeId>,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct ImportFromNode {
    pub tok_from: Token,
    pub module: NodeId,
    pub tok_import: Token,
    pub aliases: SeparatedList<NodeId>,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct AliasNode {
    pub name: NodeId,
    pub tok_as: Option<Token>,
    pub tok_alias: Option<Token>,
}

#[derive(Debug, Clone)]
pub struct QualifiedNameNode {
    pub names: SeparatedList<Token>,
}

impl QualifiedNameNode {
    /// The dotted name as written, e.g. `a.b.c`
    pub fn text(&self) -> String {
        self.names
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// `[[ name(args), … ]]` attribute block preceding a member
#[derive(Debug, Clone)]
pub struct AttributeListNode {
    pub tok_open1: Token,
    pub tok_open2: Token,
    pub attributes: SeparatedList<NodeId>,
    pub tok_close1: Token,
    pub tok_close2: Token,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct AttributeNode {
    pub tok_name: Token,
    pub tok_open: Option<Token>,
    pub arguments: SeparatedList<NodeId>,
    pub tok_close: Option<Token>,
}

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub attributes: Option<NodeId>,
    pub tok_class: Token,
    pub tok_name: Token,
    pub generics: Option<GenericParamList>,
    pub tok_colon: Token,
    pub body: TypeBody,
}

#[derive(Debug, Clone)]
pub struct StructNode {
    pub attributes: Option<NodeId>,
    pub tok_struct: Token,
    pub tok_name: Token,
    pub generics: Option<GenericParamList>,
    pub tok_colon: Token,
    pub body: TypeBody,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub attributes: Option<NodeId>,
    pub tok_def: Token,
    pub tok_name: Token,
    pub generics: Option<GenericParamList>,
    pub tok_open: Token,
    pub parameters: SeparatedList<NodeId>,
    pub tok_close: Token,
    pub tok_arrow: Option<Token>,
    pub return_type: NodeId,
    pub tok_colon: Token,
    pub body: FunctionBody,
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub attributes: Option<NodeId>,
    pub tok_name: Token,
    pub tok_colon: Token,
    pub field_type: NodeId,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct PassMemberNode {
    pub attributes: Option<NodeId>,
    pub tok_pass: Token,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct GenericParameterNode {
    pub tok_name: Token,
}

#[derive(Debug, Clone)]
pub struct ParameterNode {
    pub tok_name: Token,
    pub tok_colon: Option<Token>,
    pub param_type: NodeId,
}

#[derive(Debug, Clone)]
pub struct NamedTypeNode {
    pub tok_name: Token,
}

#[derive(Debug, Clone)]
pub struct ParameterizedTypeNode {
    pub base: NodeId,
    pub tok_open: Token,
    pub arguments: SeparatedList<NodeId>,
    pub tok_close: Token,
}

/// Placeholder for an omitted parameter or return type
#[derive(Debug, Clone)]
pub struct AutoTypeNode;

#[derive(Debug, Clone)]
pub struct BlockNode {
    pub tok_indent: Token,
    pub statements: Vec<NodeId>,
    pub tok_dedent: Token,
}

#[derive(Debug, Clone)]
pub struct PassStmtNode {
    pub tok_pass: Token,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct ReturnStmtNode {
    pub tok_return: Token,
    pub value: Option<NodeId>,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct ExprStmtNode {
    pub value: NodeId,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct AssignStmtNode {
    pub target: NodeId,
    pub tok_equals: Token,
    pub value: NodeId,
    pub tok_newline: Token,
}

/// `if`/`elif` statement; `elif` chains are nested condition nodes
#[derive(Debug, Clone)]
pub struct ConditionStmtNode {
    pub tok_if: Token,
    pub condition: NodeId,
    pub tok_colon: Token,
    pub tok_newline: Token,
    pub then_block: NodeId,
    pub else_clause: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ElseNode {
    pub tok_else: Token,
    pub tok_colon: Token,
    pub tok_newline: Token,
    pub block: NodeId,
}

#[derive(Debug, Clone)]
pub struct WhileStmtNode {
    pub tok_while: Token,
    pub condition: NodeId,
    pub tok_colon: Token,
    pub tok_newline: Token,
    pub then_block: NodeId,
    pub else_clause: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EllipsisStmtNode {
    pub tok_ellipsis: Token,
    pub tok_newline: Token,
}

#[derive(Debug, Clone)]
pub struct IntLiteralNode {
    pub tok_number: Token,
}

impl IntLiteralNode {
    pub fn value(&self) -> Option<i64> {
        self.tok_number.text.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct StrLiteralNode {
    pub tok_string: Token,
}

impl StrLiteralNode {
    /// The literal's value with quotes stripped and escapes resolved
    pub fn value(&self) -> String {
        let text = &self.tok_string.text;
        let inner = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        let mut result = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => result.push('\\'),
                }
            } else {
                result.push(c);
            }
        }
        result
    }
}

#[derive(Debug, Clone)]
pub struct NameExprNode {
    pub tok_name: Token,
}

#[derive(Debug, Clone)]
pub struct CallExprNode {
    pub callee: NodeId,
    pub tok_open: Token,
    pub arguments: SeparatedList<NodeId>,
    pub tok_close: Token,
}

#[derive(Debug, Clone)]
pub struct SubscriptExprNode {
    pub callee: NodeId,
    pub tok_open: Token,
    pub arguments: SeparatedList<NodeId>,
    pub tok_close: Token,
}

#[derive(Debug, Clone)]
pub struct AttrExprNode {
    pub value: NodeId,
    pub tok_dot: Token,
    pub tok_name: Token,
}

#[derive(Debug, Clone)]
pub struct ParenExprNode {
    pub tok_open: Token,
    pub value: NodeId,
    pub tok_close: Token,
}

#[derive(Debug, Clone)]
pub struct UnaryExprNode {
    pub op: UnaryOp,
    pub tok_op: Token,
    pub operand: NodeId,
}

#[derive(Debug, Clone)]
pub struct BinaryExprNode {
    pub op: BinaryOp,
    pub left: NodeId,
    pub tok_op: Token,
    pub right: NodeId,
}

/// All composite node kinds
#[derive(Debug, Clone)]
pub enum Node {
    Module(ModuleNode),
    Import(ImportNode),
    ImportFrom(ImportFromNode),
    Alias(AliasNode),
    QualifiedName(QualifiedNameNode),
    AttributeList(AttributeListNode),
    Attribute(AttributeNode),
    Class(ClassNode),
    Struct(StructNode),
    Function(FunctionNode),
    Field(FieldNode),
    PassMember(PassMemberNode),
    GenericParameter(GenericParameterNode),
    Parameter(ParameterNode),
    NamedType(NamedTypeNode),
    ParameterizedType(ParameterizedTypeNode),
    AutoType(AutoTypeNode),
    Block(BlockNode),
    PassStmt(PassStmtNode),
    ReturnStmt(ReturnStmtNode),
    ExprStmt(ExprStmtNode),
    AssignStmt(AssignStmtNode),
    ConditionStmt(ConditionStmtNode),
    Else(ElseNode),
    WhileStmt(WhileStmtNode),
    EllipsisStmt(EllipsisStmtNode),
    IntLiteral(IntLiteralNode),
    StrLiteral(StrLiteralNode),
    NameExpr(NameExprNode),
    CallExpr(CallExprNode),
    SubscriptExpr(SubscriptExprNode),
    AttrExpr(AttrExprNode),
    ParenExpr(ParenExprNode),
    UnaryExpr(UnaryExprNode),
    BinaryExpr(BinaryExprNode),
}

/// Arena holding all nodes of one parsed module
#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    locations: Vec<Location>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and its location, returning its id
    pub fn alloc(&mut self, node: Node, location: Location) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.locations.push(location);
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The module node; present for every parse, even a failed one
    pub fn root(&self) -> NodeId {
        self.root.expect("tree has no root; parser did not finish")
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn location(&self, id: NodeId) -> &Location {
        &self.locations[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flatten the subtree back to text (trivia + lexeme of every token)
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for token in self.tokens(id) {
            out.push_str(&token.trivia);
            out.push_str(&token.text);
        }
        out
    }

    /// All tokens of the subtree in source order
    pub fn tokens(&self, id: NodeId) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(id, &mut out);
        out
    }

    fn collect_list<'a>(&'a self, list: &'a SeparatedList<NodeId>, out: &mut Vec<&'a Token>) {
        let n = list.items.len().max(list.separators.len());
        for i in 0..n {
            if let Some(&item) = list.items.get(i) {
                self.collect_tokens(item, out);
            }
            if let Some(sep) = list.separators.get(i) {
                out.push(sep);
            }
        }
    }

    fn collect_tokens<'a>(&'a self, id: NodeId, out: &mut Vec<&'a Token>) {
        match self.node(id) {
            Node::Module(n) => {
                for &import in &n.imports {
                    self.collect_tokens(import, out);
                }
                for &member in &n.members {
                    self.collect_tokens(member, out);
                }
                out.push(&n.tok_eof);
            }
            Node::Import(n) => {
                out.push(&n.tok_import);
                self.collect_list(&n.aliases, out);
                out.push(&n.tok_newline);
            }
            Node::ImportFrom(n) => {
                out.push(&n.tok_from);
                self.collect_tokens(n.module, out);
                out.push(&n.tok_import);
                self.collect_list(&n.aliases, out);
                out.push(&n.tok_newline);
            }
            Node::Alias(n) => {
                self.collect_tokens(n.name, out);
                if let Some(tok) = &n.tok_as {
                    out.push(tok);
                }
                if let Some(tok) = &n.tok_alias {
                    out.push(tok);
                }
            }
            Node::QualifiedName(n) => {
                let list = &n.names;
                let count = list.items.len().max(list.separators.len());
                for i in 0..count {
                    if let Some(name) = list.items.get(i) {
                        out.push(name);
                    }
                    if let Some(sep) = list.separators.get(i) {
                        out.push(sep);
                    }
                }
            }
            Node::AttributeList(n) => {
                out.push(&n.tok_open1);
                out.push(&n.tok_open2);
                self.collect_list(&n.attributes, out);
                out.push(&n.tok_close1);
                out.push(&n.tok_close2);
                out.push(&n.tok_newline);
            }
            Node::Attribute(n) => {
                out.push(&n.tok_name);
                if let Some(tok) = &n.tok_open {
                    out.push(tok);
                }
                self.collect_list(&n.arguments, out);
                if let Some(tok) = &n.tok_close {
                    out.push(tok);
                }
            }
            Node::Class(n) => {
                if let Some(attrs) = n.attributes {
                    self.collect_tokens(attrs, out);
                }
                out.push(&n.tok_class);
                out.push(&n.tok_name);
                self.collect_generics(&n.generics, out);
                out.push(&n.tok_colon);
                self.collect_type_body(&n.body, out);
            }
            Node::Struct(n) => {
                if let Some(attrs) = n.attributes {
                    self.collect_tokens(attrs, out);
                }
                out.push(&n.tok_struct);
                out.push(&n.tok_name);
                self.collect_generics(&n.generics, out);
                out.push(&n.tok_colon);
                self.collect_type_body(&n.body, out);
            }
            Node::Function(n) => {
                if let Some(attrs) = n.attributes {
                    self.collect_tokens(attrs, out);
                }
                out.push(&n.tok_def);
                out.push(&n.tok_name);
                self.collect_generics(&n.generics, out);
                out.push(&n.tok_open);
                self.collect_list(&n.parameters, out);
                out.push(&n.tok_close);
                if let Some(tok) = &n.tok_arrow {
                    out.push(tok);
                    self.collect_tokens(n.return_type, out);
                }
                out.push(&n.tok_colon);
                match &n.body {
                    FunctionBody::Ellipsis(stmt) => self.collect_tokens(*stmt, out),
                    FunctionBody::Block { tok_newline, block } => {
                        out.push(tok_newline);
                        self.collect_tokens(*block, out);
                    }
                }
            }
            Node::Field(n) => {
                if let Some(attrs) = n.attributes {
                    self.collect_tokens(attrs, out);
                }
                out.push(&n.tok_name);
                out.push(&n.tok_colon);
                self.collect_tokens(n.field_type, out);
                out.push(&n.tok_newline);
            }
            Node::PassMember(n) => {
                if let Some(attrs) = n.attributes {
                    self.collect_tokens(attrs, out);
                }
                out.push(&n.tok_pass);
                out.push(&n.tok_newline);
            }
            Node::GenericParameter(n) => {
                out.push(&n.tok_name);
            }
            Node::Parameter(n) => {
                out.push(&n.tok_name);
                if let Some(tok) = &n.tok_colon {
                    out.push(tok);
                    self.collect_tokens(n.param_type, out);
                }
            }
            Node::NamedType(n) => {
                out.push(&n.tok_name);
            }
            Node::ParameterizedType(n) => {
                self.collect_tokens(n.base, out);
                out.push(&n.tok_open);
                self.collect_list(&n.arguments, out);
                out.push(&n.tok_close);
            }
            Node::AutoType(_) => {}
            Node::Block(n) => {
                out.push(&n.tok_indent);
                for &stmt in &n.statements {
                    self.collect_tokens(stmt, out);
                }
                out.push(&n.tok_dedent);
            }
            Node::PassStmt(n) => {
                out.push(&n.tok_pass);
                out.push(&n.tok_newline);
            }
            Node::ReturnStmt(n) => {
                out.push(&n.tok_return);
                if let Some(value) = n.value {
                    self.collect_tokens(value, out);
                }
                out.push(&n.tok_newline);
            }
            Node::ExprStmt(n) => {
                self.collect_tokens(n.value, out);
                out.push(&n.tok_newline);
            }
            Node::AssignStmt(n) => {
                self.collect_tokens(n.target, out);
                out.push(&n.tok_equals);
                self.collect_tokens(n.value, out);
                out.push(&n.tok_newline);
            }
            Node::ConditionStmt(n) => {
                out.push(&n.tok_if);
                self.collect_tokens(n.condition, out);
                out.push(&n.tok_colon);
                out.push(&n.tok_newline);
                self.collect_tokens(n.then_block, out);
                if let Some(else_clause) = n.else_clause {
                    self.collect_tokens(else_clause, out);
                }
            }
            Node::Else(n) => {
                out.push(&n.tok_else);
                out.push(&n.tok_colon);
                out.push(&n.tok_newline);
                self.collect_tokens(n.block, out);
            }
            Node::WhileStmt(n) => {
                out.push(&n.tok_while);
                self.collect_tokens(n.condition, out);
                out.push(&n.tok_colon);
                out.push(&n.tok_newline);
                self.collect_tokens(n.then_block, out);
                if let Some(else_clause) = n.else_clause {
                    self.collect_tokens(else_clause, out);
                }
            }
            Node::EllipsisStmt(n) => {
                out.push(&n.tok_ellipsis);
                out.push(&n.tok_newline);
            }
            Node::IntLiteral(n) => {
                out.push(&n.tok_number);
            }
            Node::StrLiteral(n) => {
                out.push(&n.tok_string);
            }
            Node::NameExpr(n) => {
                out.push(&n.tok_name);
            }
            Node::CallExpr(n) => {
                self.collect_tokens(n.callee, out);
                out.push(&n.tok_open);
                self.collect_list(&n.arguments, out);
                out.push(&n.tok_close);
            }
            Node::SubscriptExpr(n) => {
                self.collect_tokens(n.callee, out);
                out.push(&n.tok_open);
                self.collect_list(&n.arguments, out);
                out.push(&n.tok_close);
            }
            Node::AttrExpr(n) => {
                self.collect_tokens(n.value, out);
                out.push(&n.tok_dot);
                out.push(&n.tok_name);
            }
            Node::ParenExpr(n) => {
                out.push(&n.tok_open);
                self.collect_tokens(n.value, out);
                out.push(&n.tok_close);
            }
            Node::UnaryExpr(n) => {
                out.push(&n.tok_op);
                self.collect_tokens(n.operand, out);
            }
            Node::BinaryExpr(n) => {
                self.collect_tokens(n.left, out);
                out.push(&n.tok_op);
                self.collect_tokens(n.right, out);
            }
        }
    }

    fn collect_generics<'a>(&'a self, generics: &'a Option<GenericParamList>, out: &mut Vec<&'a Token>) {
        if let Some(generics) = generics {
            out.push(&generics.tok_open);
            self.collect_list(&generics.parameters, out);
            out.push(&generics.tok_close);
        }
    }

    fn collect_type_body<'a>(&'a self, body: &'a TypeBody, out: &mut Vec<&'a Token>) {
        match body {
            TypeBody::Ellipsis {
                tok_ellipsis,
                tok_newline,
            } => {
                out.push(tok_ellipsis);
                out.push(tok_newline);
            }
            TypeBody::Members {
                tok_newline,
                tok_indent,
                members,
                tok_dedent,
            } => {
                out.push(tok_newline);
                out.push(tok_indent);
                for &member in members {
                    self.collect_tokens(member, out);
                }
                out.push(tok_dedent);
            }
        }
    }

    /// Direct child nodes in source order (for the scope annotation walk)
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        fn list(l: &SeparatedList<NodeId>, out: &mut Vec<NodeId>) {
            out.extend(l.items.iter().copied());
        }
        let mut out = Vec::new();
        match self.node(id) {
            Node::Module(n) => {
                out.extend(n.imports.iter().copied());
                out.extend(n.members.iter().copied());
            }
            Node::Import(n) => list(&n.aliases, &mut out),
            Node::ImportFrom(n) => {
                out.push(n.module);
                list(&n.aliases, &mut out);
            }
            Node::Alias(n) => out.push(n.name),
            Node::QualifiedName(_) => {}
            Node::AttributeList(n) => list(&n.attributes, &mut out),
            Node::Attribute(n) => list(&n.arguments, &mut out),
            Node::Class(n) => {
                if let Some(attrs) = n.attributes {
                    out.push(attrs);
                }
                if let Some(generics) = &n.generics {
                    list(&generics.parameters, &mut out);
                }
                if let TypeBody::Members { members, .. } = &n.body {
                    out.extend(members.iter().copied());
                }
            }
            Node::Struct(n) => {
                if let Some(attrs) = n.attributes {
                    out.push(attrs);
                }
                if let Some(generics) = &n.generics {
                    list(&generics.parameters, &mut out);
                }
                if let TypeBody::Members { members, .. } = &n.body {
                    out.extend(members.iter().copied());
                }
            }
            Node::Function(n) => {
                if let Some(attrs) = n.attributes {
                    out.push(attrs);
                }
                if let Some(generics) = &n.generics {
                    list(&generics.parameters, &mut out);
                }
                list(&n.parameters, &mut out);
                out.push(n.return_type);
                match &n.body {
                    FunctionBody::Ellipsis(stmt) => out.push(*stmt),
                    FunctionBody::Block { block, .. } => out.push(*block),
                }
            }
            Node::Field(n) => {
                if let Some(attrs) = n.attributes {
                    out.push(attrs);
                }
                out.push(n.field_type);
            }
            Node::PassMember(n) => {
                if let Some(attrs) = n.attributes {
                    out.push(attrs);
                }
            }
            Node::GenericParameter(_) => {}
            Node::Parameter(n) => out.push(n.param_type),
            Node::NamedType(_) => {}
            Node::ParameterizedType(n) => {
                out.push(n.base);
                list(&n.arguments, &mut out);
            }
            Node::AutoType(_) => {}
            Node::Block(n) => out.extend(n.statements.iter().copied()),
            Node::PassStmt(_) => {}
            Node::ReturnStmt(n) => out.extend(n.value),
            Node::ExprStmt(n) => out.push(n.value),
            Node::AssignStmt(n) => {
                out.push(n.target);
                out.push(n.value);
            }
            Node::ConditionStmt(n) => {
                out.push(n.condition);
                out.push(n.then_block);
                out.extend(n.else_clause);
            }
            Node::Else(n) => out.push(n.block),
            Node::WhileStmt(n) => {
                out.push(n.condition);
                out.push(n.then_block);
                out.extend(n.else_clause);
            }
            Node::EllipsisStmt(_) => {}
            Node::IntLiteral(_) | Node::StrLiteral(_) | Node::NameExpr(_) => {}
            Node::CallExpr(n) => {
                out.push(n.callee);
                list(&n.arguments, &mut out);
            }
            Node::SubscriptExpr(n) => {
                out.push(n.callee);
                list(&n.arguments, &mut out);
            }
            Node::AttrExpr(n) => out.push(n.value),
            Node::ParenExpr(n) => out.push(n.value),
            Node::UnaryExpr(n) => out.push(n.operand),
            Node::BinaryExpr(n) => {
                out.push(n.left);
                out.push(n.right);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    #[test]
    fn test_str_literal_value() {
        let tok = Token::new(TokenKind::String, "\"a\\n\\\"b\"", "", Location::default());
        let node = StrLiteralNode { tok_string: tok };
        assert_eq!(node.value(), "a\n\"b");
    }

    #[test]
    fn test_int_literal_value() {
        let tok = Token::new(TokenKind::Number, "42", "", Location::default());
        let node = IntLiteralNode { tok_number: tok };
        assert_eq!(node.value(), Some(42));
    }

    #[test]
    fn test_dunder_mapping() {
        assert_eq!(BinaryOp::Add.dunder(), Some("__add__"));
        assert_eq!(BinaryOp::Pow.dunder(), None);
        assert_eq!(UnaryOp::Inv.dunder(), "__not__");
    }
}
