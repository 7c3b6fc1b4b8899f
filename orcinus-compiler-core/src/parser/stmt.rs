// Statement parsing for Orcinus
//
// Statements are newline-terminated; the end of line is the recovery sync
// point, so a broken statement never poisons the rest of the block.

use crate::cst::{
    AssignStmtNode, BlockNode, ConditionStmtNode, EllipsisStmtNode, ElseNode, ExprStmtNode, Node,
    NodeId, PassStmtNode, ReturnStmtNode, WhileStmtNode,
};
use crate::lexer::TokenKind;

use super::{Parser, EXPRESSION_STARTS, STATEMENT_STARTS};

impl Parser {
    /// block := INDENT statement { statement } DEDENT
    pub(crate) fn parse_block(&mut self) -> NodeId {
        let tok_indent = self.consume(&[TokenKind::Indent]);
        let mut statements = Vec::new();
        if let Some(first) = self.parse_statement() {
            statements.push(first);
        }
        while self.at(STATEMENT_STARTS) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
        }
        let tok_dedent = self.consume(&[TokenKind::Dedent]);

        let location = tok_indent.location.merge(&tok_dedent.location);
        self.tree.alloc(
            Node::Block(BlockNode {
                tok_indent,
                statements,
                tok_dedent,
            }),
            location,
        )
    }

    /// statement := pass | return | if | while | expr_or_assign
    fn parse_statement(&mut self) -> Option<NodeId> {
        match self.current_kind() {
            TokenKind::Pass => Some(self.parse_pass_statement()),
            TokenKind::Return => Some(self.parse_return_statement()),
            TokenKind::If => Some(self.parse_condition_statement(TokenKind::If)),
            TokenKind::While => Some(self.parse_while_statement()),
            kind if EXPRESSION_STARTS.contains(&kind) => Some(self.parse_expression_statement()),
            _ => {
                let _ = self.consume(STATEMENT_STARTS);
                self.resume(&[TokenKind::Newline]);
                None
            }
        }
    }

    /// pass_statement := 'pass' NL
    fn parse_pass_statement(&mut self) -> NodeId {
        let tok_pass = self.bump();
        let tok_newline = self.resume(&[TokenKind::Newline]);

        let location = tok_pass.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::PassStmt(PassStmtNode {
                tok_pass,
                tok_newline,
            }),
            location,
        )
    }

    /// return_statement := 'return' [ expression ] NL
    fn parse_return_statement(&mut self) -> NodeId {
        let tok_return = self.bump();
        let value = if self.at(EXPRESSION_STARTS) {
            Some(self.parse_expression())
        } else {
            None
        };
        let tok_newline = self.resume(&[TokenKind::Newline]);

        let location = tok_return.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::ReturnStmt(ReturnStmtNode {
                tok_return,
                value,
                tok_newline,
            }),
            location,
        )
    }

    /// ellipsis_statement := '...' NL
    pub(crate) fn parse_ellipsis_statement(&mut self) -> NodeId {
        let tok_ellipsis = self.consume(&[TokenKind::Ellipsis]);
        let tok_newline = self.resume(&[TokenKind::Newline]);

        let location = tok_ellipsis.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::EllipsisStmt(EllipsisStmtNode {
                tok_ellipsis,
                tok_newline,
            }),
            location,
        )
    }

    /// condition_statement := ('if' | 'elif') expression ':' NL block
    ///                        [ else_statement | elif-chain ]
    fn parse_condition_statement(&mut self, keyword: TokenKind) -> NodeId {
        let tok_if = self.consume(&[keyword]);
        let condition = self.parse_expression();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let tok_newline = self.resume(&[TokenKind::Newline]);
        let then_block = self.parse_block();

        let else_clause = if self.at(&[TokenKind::Else]) {
            Some(self.parse_else_statement())
        } else if self.at(&[TokenKind::Elif]) {
            Some(self.parse_condition_statement(TokenKind::Elif))
        } else {
            None
        };

        let end = else_clause
            .map(|node| self.tree.location(node).clone())
            .unwrap_or_else(|| self.tree.location(then_block).clone());
        let location = tok_if.location.merge(&end);
        self.tree.alloc(
            Node::ConditionStmt(ConditionStmtNode {
                tok_if,
                condition,
                tok_colon,
                tok_newline,
                then_block,
                else_clause,
            }),
            location,
        )
    }

    /// else_statement := 'else' ':' NL block
    fn parse_else_statement(&mut self) -> NodeId {
        let tok_else = self.bump();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let tok_newline = self.resume(&[TokenKind::Newline]);
        let block = self.parse_block();

        let location = tok_else.location.merge(self.tree.location(block));
        self.tree.alloc(
            Node::Else(ElseNode {
                tok_else,
                tok_colon,
                tok_newline,
                block,
            }),
            location,
        )
    }

    /// while_statement := 'while' expression ':' NL block [ else_statement ]
    fn parse_while_statement(&mut self) -> NodeId {
        let tok_while = self.bump();
        let condition = self.parse_expression();
        let tok_colon = self.consume(&[TokenKind::Colon]);
        let tok_newline = self.resume(&[TokenKind::Newline]);
        let then_block = self.parse_block();

        let else_clause = if self.at(&[TokenKind::Else]) {
            Some(self.parse_else_statement())
        } else {
            None
        };

        let end = else_clause
            .map(|node| self.tree.location(node).clone())
            .unwrap_or_else(|| self.tree.location(then_block).clone());
        let location = tok_while.location.merge(&end);
        self.tree.alloc(
            Node::WhileStmt(WhileStmtNode {
                tok_while,
                condition,
                tok_colon,
                tok_newline,
                then_block,
                else_clause,
            }),
            location,
        )
    }

    /// expression_statement := expression [ '=' expression ] NL
    fn parse_expression_statement(&mut self) -> NodeId {
        let expression = self.parse_expression();

        if self.at(&[TokenKind::Equals]) {
            let tok_equals = self.bump();
            let value = self.parse_expression();
            let tok_newline = self.resume(&[TokenKind::Newline]);

            let location = self.tree.location(expression).merge(&tok_newline.location);
            return self.tree.alloc(
                Node::AssignStmt(AssignStmtNode {
                    target: expression,
                    tok_equals,
                    value,
                    tok_newline,
                }),
                location,
            );
        }

        let tok_newline = self.resume(&[TokenKind::Newline]);
        let location = self.tree.location(expression).merge(&tok_newline.location);
        self.tree.alloc(
            Node::ExprStmt(ExprStmtNode {
                value: expression,
                tok_newline,
            }),
            location,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::cst::{FunctionBody, Node};
    use crate::parser::parse;

    fn body_statements(source: &str) -> (crate::cst::SyntaxTree, Vec<crate::cst::NodeId>) {
        let result = parse("test.orx", source);
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
            panic!("expected block body");
        };
        let Node::Block(block) = tree.node(*block) else {
            panic!("expected block");
        };
        let statements = block.statements.clone();
        (tree, statements)
    }

    #[test]
    fn test_parse_statements() {
        let source = "def f(x: int) -> int:\n    pass\n    x = x + 1\n    return x\n";
        let (tree, statements) = body_statements(source);
        assert_eq!(statements.len(), 3);
        assert!(matches!(tree.node(statements[0]), Node::PassStmt(_)));
        assert!(matches!(tree.node(statements[1]), Node::AssignStmt(_)));
        assert!(matches!(tree.node(statements[2]), Node::ReturnStmt(_)));
    }

    #[test]
    fn test_parse_if_elif_else() {
        let source = "def f(x: bool) -> int:\n    if x:\n        return 1\n    elif x:\n        return 2\n    else:\n        return 3\n";
        let (tree, statements) = body_statements(source);
        assert_eq!(statements.len(), 1);
        let Node::ConditionStmt(cond) = tree.node(statements[0]) else {
            panic!("expected condition");
        };
        let Node::ConditionStmt(elif) = tree.node(cond.else_clause.unwrap()) else {
            panic!("expected elif chain");
        };
        assert!(matches!(
            tree.node(elif.else_clause.unwrap()),
            Node::Else(_)
        ));
    }

    #[test]
    fn test_parse_while_with_else() {
        let source = "def f(x: bool):\n    while x:\n        pass\n    else:\n        pass\n";
        let (tree, statements) = body_statements(source);
        let Node::WhileStmt(stmt) = tree.node(statements[0]) else {
            panic!("expected while");
        };
        assert!(stmt.else_clause.is_some());
    }

    #[test]
    fn test_statement_recovery_at_line_end() {
        // The broken first statement recovers at the newline; the second
        // statement parses; exactly one diagnostic is emitted.
        let source = "def f(x: int) -> int:\n    return x +\n    return x\n";
        let result = parse("test.orx", source);
        assert_eq!(result.diagnostics.error_count(), 1);
    }
}
