// Expression parsing for Orcinus
//
// Precedence (high to low): postfix call/subscribe/attribute; unary + - ~;
// right-associative **; left-associative * / //; left-associative + -.
// Assignment is a statement, not an expression.

use crate::cst::{
    AttrExprNode, BinaryExprNode, BinaryOp, CallExprNode, IntLiteralNode, NameExprNode, Node,
    NodeId, ParenExprNode, SeparatedList, StrLiteralNode, SubscriptExprNode, UnaryExprNode,
    UnaryOp,
};
use crate::lexer::TokenKind;

use super::{Parser, EXPRESSION_STARTS};

impl Parser {
    /// expression := addition
    pub(crate) fn parse_expression(&mut self) -> NodeId {
        self.parse_addition()
    }

    /// addition := multiplication { ('+' | '-') unary }
    fn parse_addition(&mut self) -> NodeId {
        let mut expression = self.parse_multiplication();
        while self.at(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOp::Add,
                _ => BinaryOp::Sub,
            };
            let tok_op = self.bump();
            let right = self.parse_unary();
            expression = self.alloc_binary(op, expression, tok_op, right);
        }
        expression
    }

    /// multiplication := unary { ('*' | '/' | '//') unary }
    fn parse_multiplication(&mut self) -> NodeId {
        let mut expression = self.parse_unary();
        while self.at(&[TokenKind::Star, TokenKind::Slash, TokenKind::SlashSlash]) {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => BinaryOp::FloorDiv,
            };
            let tok_op = self.bump();
            let right = self.parse_unary();
            expression = self.alloc_binary(op, expression, tok_op, right);
        }
        expression
    }

    /// unary := ('+' | '-' | '~') unary | power
    fn parse_unary(&mut self) -> NodeId {
        let op = match self.current_kind() {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Tilde => UnaryOp::Inv,
            _ => return self.parse_power(),
        };
        let tok_op = self.bump();
        let operand = self.parse_unary();

        let location = tok_op.location.merge(self.tree.location(operand));
        self.tree.alloc(
            Node::UnaryExpr(UnaryExprNode {
                op,
                tok_op,
                operand,
            }),
            location,
        )
    }

    /// power := primary [ '**' unary ]   (right-associative)
    fn parse_power(&mut self) -> NodeId {
        let expression = self.parse_primary();
        if self.at(&[TokenKind::StarStar]) {
            let tok_op = self.bump();
            let right = self.parse_unary();
            return self.alloc_binary(BinaryOp::Pow, expression, tok_op, right);
        }
        expression
    }

    /// primary := INT | STRING | Name | '(' expression ')'
    ///            { '(' args ')' | '[' args ']' | '.' Name }
    fn parse_primary(&mut self) -> NodeId {
        let mut expression = match self.current_kind() {
            TokenKind::Number => {
                let tok_number = self.bump();
                let location = tok_number.location.clone();
                self.tree
                    .alloc(Node::IntLiteral(IntLiteralNode { tok_number }), location)
            }
            TokenKind::String => {
                let tok_string = self.bump();
                let location = tok_string.location.clone();
                self.tree
                    .alloc(Node::StrLiteral(StrLiteralNode { tok_string }), location)
            }
            TokenKind::Name => {
                let tok_name = self.bump();
                let location = tok_name.location.clone();
                self.tree
                    .alloc(Node::NameExpr(NameExprNode { tok_name }), location)
            }
            TokenKind::LParen => {
                let tok_open = self.bump();
                let value = self.parse_expression();
                let tok_close = self.resume(&[TokenKind::RParen]);

                let location = tok_open.location.merge(&tok_close.location);
                self.tree.alloc(
                    Node::ParenExpr(ParenExprNode {
                        tok_open,
                        value,
                        tok_close,
                    }),
                    location,
                )
            }
            _ => {
                // Not an expression start: report, and stand in with an
                // error-token name so lowering can poison it.
                let tok_name = self.consume(EXPRESSION_STARTS);
                let location = tok_name.location.clone();
                self.tree
                    .alloc(Node::NameExpr(NameExprNode { tok_name }), location)
            }
        };

        loop {
            match self.current_kind() {
                TokenKind::LParen => {
                    let tok_open = self.bump();
                    let arguments = self.parse_arguments();
                    let tok_close = self.resume(&[TokenKind::RParen]);

                    let location = self.tree.location(expression).merge(&tok_close.location);
                    expression = self.tree.alloc(
                        Node::CallExpr(CallExprNode {
                            callee: expression,
                            tok_open,
                            arguments,
                            tok_close,
                        }),
                        location,
                    );
                }
                TokenKind::LBracket => {
                    let tok_open = self.bump();
                    let arguments = self.parse_arguments();
                    let tok_close = self.resume(&[TokenKind::RBracket]);

                    let location = self.tree.location(expression).merge(&tok_close.location);
                    expression = self.tree.alloc(
                        Node::SubscriptExpr(SubscriptExprNode {
                            callee: expression,
                            tok_open,
                            arguments,
                            tok_close,
                        }),
                        location,
                    );
                }
                TokenKind::Dot => {
                    let tok_dot = self.bump();
                    let tok_name = self.consume(&[TokenKind::Name]);

                    let location = self.tree.location(expression).merge(&tok_name.location);
                    expression = self.tree.alloc(
                        Node::AttrExpr(AttrExprNode {
                            value: expression,
                            tok_dot,
                            tok_name,
                        }),
                        location,
                    );
                }
                _ => break,
            }
        }
        expression
    }

    /// arguments := [ expression { ',' expression } [ ',' ] ]
    pub(crate) fn parse_arguments(&mut self) -> SeparatedList<NodeId> {
        let mut arguments = SeparatedList::new();
        if !self.at(EXPRESSION_STARTS) {
            return arguments;
        }

        arguments.items.push(self.parse_expression());
        while self.at(&[TokenKind::Comma]) {
            arguments.separators.push(self.bump());
            if self.at(EXPRESSION_STARTS) {
                arguments.items.push(self.parse_expression());
            } else {
                break;
            }
        }
        arguments
    }

    fn alloc_binary(&mut self, op: BinaryOp, left: NodeId, tok_op: crate::lexer::Token, right: NodeId) -> NodeId {
        let location = self.tree.location(left).merge(self.tree.location(right));
        self.tree.alloc(
            Node::BinaryExpr(BinaryExprNode {
                op,
                left,
                tok_op,
                right,
            }),
            location,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::cst::{BinaryOp, FunctionBody, Node, NodeId, SyntaxTree, UnaryOp};
    use crate::parser::parse;

    /// Parse `<expr>` as the body of a return statement and hand back the tree
    fn parse_expr(expr: &str) -> (SyntaxTree, NodeId) {
        let source = format!("def f(x: int) -> int:\n    return {}\n", expr);
        let result = parse("test.orx", &source);
        assert!(
            !result.diagnostics.has_errors(),
            "unexpected errors: {:?}",
            result.diagnostics.as_slice()
        );
        let tree = result.tree;
        let root = tree.root();
        let Node::Module(module) = tree.node(root) else {
            panic!("expected module");
        };
        let Node::Function(func) = tree.node(module.members[0]) else {
            panic!("expected function");
        };
        let FunctionBody::Block { block, .. } = &func.body else {
            panic!("expected block");
        };
        let Node::Block(block) = tree.node(*block) else {
            panic!("expected block");
        };
        let Node::ReturnStmt(ret) = tree.node(block.statements[0]) else {
            panic!("expected return");
        };
        let value = ret.value.unwrap();
        (tree, value)
    }

    #[test]
    fn test_precedence_add_mul() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let (tree, expr) = parse_expr("1 + 2 * 3");
        let Node::BinaryExpr(add) = tree.node(expr) else {
            panic!("expected binary");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(tree.node(add.left), Node::IntLiteral(_)));
        let Node::BinaryExpr(mul) = tree.node(add.right) else {
            panic!("expected nested binary");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
    }

    #[test]
    fn test_left_associative_sub() {
        // 1 - 2 - 3 parses as (1 - 2) - 3
        let (tree, expr) = parse_expr("1 - 2 - 3");
        let Node::BinaryExpr(outer) = tree.node(expr) else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinaryOp::Sub);
        assert!(matches!(tree.node(outer.left), Node::BinaryExpr(_)));
        assert!(matches!(tree.node(outer.right), Node::IntLiteral(_)));
    }

    #[test]
    fn test_right_associative_pow() {
        // 2 ** 3 ** 4 parses as 2 ** (3 ** 4)
        let (tree, expr) = parse_expr("2 ** 3 ** 4");
        let Node::BinaryExpr(outer) = tree.node(expr) else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinaryOp::Pow);
        assert!(matches!(tree.node(outer.left), Node::IntLiteral(_)));
        let Node::BinaryExpr(inner) = tree.node(outer.right) else {
            panic!("expected nested pow");
        };
        assert_eq!(inner.op, BinaryOp::Pow);
    }

    #[test]
    fn test_unary_binds_tighter_than_mul() {
        // -x * y parses as (-x) * y
        let (tree, expr) = parse_expr("-x * y");
        let Node::BinaryExpr(mul) = tree.node(expr) else {
            panic!("expected binary");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
        let Node::UnaryExpr(neg) = tree.node(mul.left) else {
            panic!("expected unary");
        };
        assert_eq!(neg.op, UnaryOp::Neg);
    }

    #[test]
    fn test_postfix_chain() {
        let (tree, expr) = parse_expr("a.b(1)[2].c");
        // Outermost is the .c attribute access
        let Node::AttrExpr(attr) = tree.node(expr) else {
            panic!("expected attribute");
        };
        assert_eq!(attr.tok_name.text, "c");
        let Node::SubscriptExpr(sub) = tree.node(attr.value) else {
            panic!("expected subscript");
        };
        let Node::CallExpr(call) = tree.node(sub.callee) else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 1);
    }

    #[test]
    fn test_parenthesized() {
        // (1 + 2) * 3
        let (tree, expr) = parse_expr("(1 + 2) * 3");
        let Node::BinaryExpr(mul) = tree.node(expr) else {
            panic!("expected binary");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
        assert!(matches!(tree.node(mul.left), Node::ParenExpr(_)));
    }

    #[test]
    fn test_trailing_comma_in_arguments() {
        let (tree, expr) = parse_expr("f(1, 2,)");
        let Node::CallExpr(call) = tree.node(expr) else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_string_argument() {
        let (tree, expr) = parse_expr("f(\"hello\")");
        let Node::CallExpr(call) = tree.node(expr) else {
            panic!("expected call");
        };
        assert!(matches!(
            tree.node(call.arguments.items[0]),
            Node::StrLiteral(_)
        ));
    }
}
