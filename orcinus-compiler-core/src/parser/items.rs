// Member declarations for the Orcinus parser
//
// Covers functions, classes, structs, fields, pass members, generic
// parameter lists, and type references.

use crate::cst::{
    AutoTypeNode, ClassNode, FieldNode, FunctionBody, FunctionNode, GenericParamList,
    GenericParameterNode, NamedTypeNode, Node, NodeId, ParameterNode, ParameterizedTypeNode,
    PassMemberNode, SeparatedList, StructNode, TypeBody,
};
use crate::lexer::TokenKind;
use crate::source::Location;

use super::{Parser, MEMBERS_STARTS};

impl Parser {
    /// members := { member }
    pub(crate) fn parse_members(&mut self) -> Vec<NodeId> {
        let mut members = Vec::new();
        while self.at(MEMBERS_STARTS) {
            if let Some(member) = self.parse_member() {
                members.push(member);
            }
        }
        members
    }

    /// member := [ attributes ] (function | class | struct | pass | field)
    fn parse_member(&mut self) -> Option<NodeId> {
        let attributes = if self.at(&[TokenKind::LBracket]) {
            Some(self.parse_attribute_list())
        } else {
            None
        };

        match self.current_kind() {
            TokenKind::Def => Some(self.parse_function(attributes)),
            TokenKind::Class => Some(self.parse_class(attributes)),
            TokenKind::Struct => Some(self.parse_struct(attributes)),
            TokenKind::Pass => Some(self.parse_pass_member(attributes)),
            TokenKind::Name => Some(self.parse_field(attributes)),
            _ => {
                let _ = self.consume(&[
                    TokenKind::Def,
                    TokenKind::Class,
                    TokenKind::Struct,
                    TokenKind::Pass,
                    TokenKind::Name,
                ]);
                self.resume(&[TokenKind::Newline]);
                None
            }
        }
    }

    /// class := 'class' Name [ generic_parameters ] type_body
    fn parse_class(&mut self, attributes: Option<NodeId>) -> NodeId {
        let tok_class = self.bump();
        let tok_name = self.consume(&[TokenKind::Name]);
        let generics = self.parse_generic_parameters();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let body = self.parse_type_body();

        let location = tok_class.location.merge(&self.type_body_end(&body));
        self.tree.alloc(
            Node::Class(ClassNode {
                attributes,
                tok_class,
                tok_name,
                generics,
                tok_colon,
                body,
            }),
            location,
        )
    }

    /// struct := 'struct' Name [ generic_parameters ] type_body
    ///
    /// Generic parameters are parsed before the body so field types can
    /// refer to them.
    fn parse_struct(&mut self, attributes: Option<NodeId>) -> NodeId {
        let tok_struct = self.bump();
        let tok_name = self.consume(&[TokenKind::Name]);
        let generics = self.parse_generic_parameters();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let body = self.parse_type_body();

        let location = tok_struct.location.merge(&self.type_body_end(&body));
        self.tree.alloc(
            Node::Struct(StructNode {
                attributes,
                tok_struct,
                tok_name,
                generics,
                tok_colon,
                body,
            }),
            location,
        )
    }

    /// type_body := '...' NL | NL INDENT members DEDENT
    fn parse_type_body(&mut self) -> TypeBody {
        if self.at(&[TokenKind::Ellipsis]) {
            let tok_ellipsis = self.bump();
            let tok_newline = self.consume(&[TokenKind::Newline]);
            return TypeBody::Ellipsis {
                tok_ellipsis,
                tok_newline,
            };
        }

        let tok_newline = self.consume(&[TokenKind::Newline]);
        let tok_indent = self.consume(&[TokenKind::Indent]);
        let members = self.parse_members();
        let tok_dedent = self.consume(&[TokenKind::Dedent]);
        TypeBody::Members {
            tok_newline,
            tok_indent,
            members,
            tok_dedent,
        }
    }

    fn type_body_end(&self, body: &TypeBody) -> Location {
        match body {
            TypeBody::Ellipsis { tok_newline, .. } => tok_newline.location.clone(),
            TypeBody::Members { tok_dedent, .. } => tok_dedent.location.clone(),
        }
    }

    /// pass_member := 'pass' NL
    fn parse_pass_member(&mut self, attributes: Option<NodeId>) -> NodeId {
        let tok_pass = self.bump();
        let tok_newline = self.consume(&[TokenKind::Newline]);

        let location = tok_pass.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::PassMember(PassMemberNode {
                attributes,
                tok_pass,
                tok_newline,
            }),
            location,
        )
    }

    /// field := Name ':' type NL
    fn parse_field(&mut self, attributes: Option<NodeId>) -> NodeId {
        let tok_name = self.bump();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let field_type = self.parse_type();
        let tok_newline = self.resume(&[TokenKind::Newline]);

        let location = tok_name.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::Field(FieldNode {
                attributes,
                tok_name,
                tok_colon,
                field_type,
                tok_newline,
            }),
            location,
        )
    }

    /// function := 'def' Name [ generic_parameters ] '(' parameters ')'
    ///             [ '->' type ] ':' function_body
    fn parse_function(&mut self, attributes: Option<NodeId>) -> NodeId {
        let tok_def = self.bump();
        let tok_name = self.consume(&[TokenKind::Name]);
        let generics = self.parse_generic_parameters();
        let tok_open = self.consume(&[TokenKind::LParen]);
        let parameters = self.parse_parameters();
        let tok_close = self.resume(&[TokenKind::RParen]);

        let (tok_arrow, return_type) = if self.at(&[TokenKind::Arrow]) {
            let tok_arrow = self.bump();
            (Some(tok_arrow), self.parse_type())
        } else {
            let auto = self
                .tree
                .alloc(Node::AutoType(AutoTypeNode), tok_name.location.clone());
            (None, auto)
        };

        let tok_colon = self.consume(&[TokenKind::Colon]);
        let body = self.parse_function_body();

        let body_end = match &body {
            FunctionBody::Ellipsis(stmt) => self.tree.location(*stmt).clone(),
            FunctionBody::Block { block, .. } => self.tree.location(*block).clone(),
        };
        let location = tok_def.location.merge(&body_end);
        self.tree.alloc(
            Node::Function(FunctionNode {
                attributes,
                tok_def,
                tok_name,
                generics,
                tok_open,
                parameters,
                tok_close,
                tok_arrow,
                return_type,
                tok_colon,
                body,
            }),
            location,
        )
    }

    /// function_body := ellipsis_statement | NL block
    fn parse_function_body(&mut self) -> FunctionBody {
        if self.at(&[TokenKind::Ellipsis]) {
            return FunctionBody::Ellipsis(self.parse_ellipsis_statement());
        }
        let tok_newline = self.consume(&[TokenKind::Newline]);
        let block = self.parse_block();
        FunctionBody::Block { tok_newline, block }
    }

    /// parameters := [ parameter { ',' parameter } ]
    fn parse_parameters(&mut self) -> SeparatedList<NodeId> {
        let mut parameters = SeparatedList::new();
        if self.at(&[TokenKind::Name]) {
            parameters.items.push(self.parse_parameter());
            while self.at(&[TokenKind::Comma]) {
                parameters.separators.push(self.bump());
                parameters.items.push(self.parse_parameter());
            }
        }
        parameters
    }

    /// parameter := Name [ ':' type ]
    fn parse_parameter(&mut self) -> NodeId {
        let tok_name = self.consume(&[TokenKind::Name]);
        let (tok_colon, param_type) = if self.at(&[TokenKind::Colon]) {
            let tok_colon = self.bump();
            (Some(tok_colon), self.parse_type())
        } else {
            let auto = self
                .tree
                .alloc(Node::AutoType(AutoTypeNode), tok_name.location.clone());
            (None, auto)
        };

        let mut location = tok_name.location.clone();
        if tok_colon.is_some() {
            location = location.merge(self.tree.location(param_type));
        }
        self.tree.alloc(
            Node::Parameter(ParameterNode {
                tok_name,
                tok_colon,
                param_type,
            }),
            location,
        )
    }

    /// generic_parameters := [ '[' generic_parameter { ',' generic_parameter } ']' ]
    fn parse_generic_parameters(&mut self) -> Option<GenericParamList> {
        if !self.at(&[TokenKind::LBracket]) {
            return None;
        }
        let tok_open = self.bump();
        let mut parameters = SeparatedList::new();
        parameters.items.push(self.parse_generic_parameter());
        while self.at(&[TokenKind::Comma]) {
            parameters.separators.push(self.bump());
            parameters.items.push(self.parse_generic_parameter());
        }
        let tok_close = self.resume(&[TokenKind::RBracket]);
        Some(GenericParamList {
            tok_open,
            parameters,
            tok_close,
        })
    }

    /// generic_parameter := Name
    fn parse_generic_parameter(&mut self) -> NodeId {
        let tok_name = self.consume(&[TokenKind::Name]);
        let location = tok_name.location.clone();
        self.tree
            .alloc(Node::GenericParameter(GenericParameterNode { tok_name }), location)
    }

    /// type := Name { '[' type { ',' type } ']' }
    pub(crate) fn parse_type(&mut self) -> NodeId {
        let tok_name = self.consume(&[TokenKind::Name]);
        let location = tok_name.location.clone();
        let mut result = self
            .tree
            .alloc(Node::NamedType(NamedTypeNode { tok_name }), location);

        while self.at(&[TokenKind::LBracket]) {
            let tok_open = self.bump();
            let mut arguments = SeparatedList::new();
            arguments.items.push(self.parse_type());
            while self.at(&[TokenKind::Comma]) {
                arguments.separators.push(self.bump());
                arguments.items.push(self.parse_type());
            }
            let tok_close = self.resume(&[TokenKind::RBracket]);

            let location = self.tree.location(result).merge(&tok_close.location);
            result = self.tree.alloc(
                Node::ParameterizedType(ParameterizedTypeNode {
                    base: result,
                    tok_open,
                    arguments,
                    tok_close,
                }),
                location,
            );
        }
        result
    }
}
