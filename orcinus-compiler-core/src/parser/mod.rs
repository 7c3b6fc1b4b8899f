// Parser for Orcinus
//
// A hand-written recursive descent parser with single-token lookahead and
// no backtracking. It produces a lossless CST and recovers from errors:
//
// - `consume` reports a mismatch once, enters error mode, and substitutes a
//   zero-width Error token without advancing
// - error mode suppresses further diagnostics for the same error region
// - `resume` drops tokens until a synchronizing token is seen, consumes it,
//   and leaves error mode
//
// Sync points are end-of-line in statements and imports, and closing
// brackets in bracketed lists.

mod expr;
mod items;
mod stmt;

use crate::cst::{
    AliasNode, AttributeListNode, AttributeNode, ImportFromNode, ImportNode, ModuleNode, Node,
    NodeId, QualifiedNameNode, SeparatedList, SyntaxTree,
};
use crate::diagnostic::Diagnostics;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::source::{Location, Span};

pub(crate) const IMPORTS_STARTS: &[TokenKind] = &[TokenKind::Import, TokenKind::From];

pub(crate) const MEMBERS_STARTS: &[TokenKind] = &[
    TokenKind::Pass,
    TokenKind::Def,
    TokenKind::Class,
    TokenKind::Struct,
    TokenKind::Name,
    TokenKind::LBracket,
];

pub(crate) const EXPRESSION_STARTS: &[TokenKind] = &[
    TokenKind::Number,
    TokenKind::String,
    TokenKind::Name,
    TokenKind::LParen,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Tilde,
];

pub(crate) const STATEMENT_STARTS: &[TokenKind] = &[
    TokenKind::Number,
    TokenKind::String,
    TokenKind::Name,
    TokenKind::LParen,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Tilde,
    TokenKind::Pass,
    TokenKind::Return,
    TokenKind::While,
    TokenKind::If,
];

/// Result of parsing: the tree is always present, even for broken input
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub diagnostics: Diagnostics,
}

/// Parser state
pub struct Parser {
    filename: String,
    tokens: Vec<Token>,
    cursor: usize,
    is_error_mode: bool,
    diagnostics: Diagnostics,
    pub(crate) tree: SyntaxTree,
}

impl Parser {
    /// Create a parser over pre-scanned tokens
    pub fn new(filename: impl Into<String>, tokens: Vec<Token>, diagnostics: Diagnostics) -> Self {
        Self {
            filename: filename.into(),
            tokens,
            cursor: 0,
            is_error_mode: false,
            diagnostics,
            tree: SyntaxTree::new(),
        }
    }

    /// Parse the token stream into a module tree
    pub fn parse(mut self) -> ParseResult {
        let imports = self.parse_imports();
        let members = self.parse_members();
        let tok_eof = self.consume(&[TokenKind::Eof]);

        let end = tok_eof.location.span.end;
        let location = Location::new(self.filename.clone(), Span::new(0, end));
        let root = self.tree.alloc(
            Node::Module(ModuleNode {
                imports,
                members,
                tok_eof,
            }),
            location,
        );
        self.tree.set_root(root);

        ParseResult {
            tree: self.tree,
            diagnostics: self.diagnostics,
        }
    }

    // =========================================================================
    // Token operations
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        self.tokens.get(self.cursor).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should always end with Eof")
        })
    }

    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Zero-width location just before the current token
    pub(crate) fn previous_location(&self) -> Location {
        Location::point(self.filename.clone(), self.current().location.span.start)
    }

    /// Peek: does the current token match any of the given kinds?
    pub(crate) fn at(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    /// Advance and return the current token; never moves past Eof
    pub(crate) fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    /// Consume the current token if it matches, otherwise report once, enter
    /// error mode, and return a zero-width Error token without advancing
    pub(crate) fn consume(&mut self, kinds: &[TokenKind]) -> Token {
        if kinds.is_empty() || self.at(kinds) {
            return self.bump();
        }

        if !self.is_error_mode {
            self.is_error_mode = true;
            let message = self.expected_message(kinds);
            let location = self.current().location.clone();
            self.diagnostics.error(message, location);
        }

        Token::missing(self.previous_location())
    }

    /// Resume normal mode at a synchronizing token: report the mismatch (once),
    /// drop tokens until a sync token or Eof, consume it, and clear error mode
    pub(crate) fn resume(&mut self, kinds: &[TokenKind]) -> Token {
        if !self.at(kinds) {
            let _ = self.consume(kinds);
            while !self.at(kinds) && self.current_kind() != TokenKind::Eof {
                self.bump();
            }
        }
        self.is_error_mode = false;
        if self.at(kinds) {
            self.bump()
        } else {
            Token::missing(self.previous_location())
        }
    }

    fn expected_message(&self, kinds: &[TokenKind]) -> String {
        let got = self.current_kind().display_name();
        if kinds.len() == 1 {
            format!("expected {}, found {}", kinds[0].display_name(), got)
        } else {
            let expected = kinds
                .iter()
                .map(|k| k.display_name())
                .collect::<Vec<_>>()
                .join(", ");
            format!("expected one of {}, found {}", expected, got)
        }
    }

    // =========================================================================
    // Imports
    // =========================================================================

    fn parse_imports(&mut self) -> Vec<NodeId> {
        let mut imports = Vec::new();
        while self.at(IMPORTS_STARTS) {
            imports.push(self.parse_import());
        }
        imports
    }

    /// import := 'import' aliases NL | 'from' qualified_name 'import' aliases NL
    fn parse_import(&mut self) -> NodeId {
        if self.at(&[TokenKind::From]) {
            let tok_from = self.bump();
            let module = self.parse_qualified_name();
            let tok_import = self.consume(&[TokenKind::Import]);
            let aliases = self.parse_aliases();
            let tok_newline = self.resume(&[TokenKind::Newline]);

            let location = tok_from.location.merge(&tok_newline.location);
            self.tree.alloc(
                Node::ImportFrom(ImportFromNode {
                    tok_from,
                    module,
                    tok_import,
                    aliases,
                    tok_newline,
                }),
                location,
            )
        } else {
            let tok_import = self.bump();
            let aliases = self.parse_aliases();
            let tok_newline = self.resume(&[TokenKind::Newline]);

            let location = tok_import.location.merge(&tok_newline.location);
            self.tree.alloc(
                Node::Import(ImportNode {
                    tok_import,
                    aliases,
                    tok_newline,
                }),
                location,
            )
        }
    }

    /// qualified_name := Name { '.' Name }
    pub(crate) fn parse_qualified_name(&mut self) -> NodeId {
        let mut names = SeparatedList::new();
        names.items.push(self.consume(&[TokenKind::Name]));
        while self.at(&[TokenKind::Dot]) {
            names.separators.push(self.bump());
            names.items.push(self.consume(&[TokenKind::Name]));
        }

        let location = names.items[0]
            .location
            .merge(&names.items[names.items.len() - 1].location);
        self.tree
            .alloc(Node::QualifiedName(QualifiedNameNode { names }), location)
    }

    /// aliases := alias { ',' alias }
    fn parse_aliases(&mut self) -> SeparatedList<NodeId> {
        let mut aliases = SeparatedList::new();
        aliases.items.push(self.parse_alias());
        while self.at(&[TokenKind::Comma]) {
            aliases.separators.push(self.bump());
            aliases.items.push(self.parse_alias());
        }
        aliases
    }

    /// alias := qualified_name [ 'as' Name ]
    fn parse_alias(&mut self) -> NodeId {
        let name = self.parse_qualified_name();
        let (tok_as, tok_alias) = if self.at(&[TokenKind::As]) {
            (Some(self.bump()), Some(self.consume(&[TokenKind::Name])))
        } else {
            (None, None)
        };

        let mut location = self.tree.location(name).clone();
        if let Some(alias) = &tok_alias {
            location = location.merge(&alias.location);
        }
        self.tree.alloc(
            Node::Alias(AliasNode {
                name,
                tok_as,
                tok_alias,
            }),
            location,
        )
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// attributes := '[' '[' attribute { ',' attribute } ']' ']' NL
    pub(crate) fn parse_attribute_list(&mut self) -> NodeId {
        let tok_open1 = self.consume(&[TokenKind::LBracket]);
        let tok_open2 = self.consume(&[TokenKind::LBracket]);

        let mut attributes = SeparatedList::new();
        attributes.items.push(self.parse_attribute());
        while self.at(&[TokenKind::Comma]) {
            attributes.separators.push(self.bump());
            attributes.items.push(self.parse_attribute());
        }

        let tok_close1 = self.resume(&[TokenKind::RBracket]);
        let tok_close2 = self.consume(&[TokenKind::RBracket]);
        let tok_newline = self.resume(&[TokenKind::Newline]);

        let location = tok_open1.location.merge(&tok_newline.location);
        self.tree.alloc(
            Node::AttributeList(AttributeListNode {
                tok_open1,
                tok_open2,
                attributes,
                tok_close1,
                tok_close2,
                tok_newline,
            }),
            location,
        )
    }

    /// attribute := Name [ '(' arguments ')' ]
    fn parse_attribute(&mut self) -> NodeId {
        let tok_name = self.consume(&[TokenKind::Name]);
        let (tok_open, arguments, tok_close) = if self.at(&[TokenKind::LParen]) {
            let tok_open = self.bump();
            let arguments = self.parse_arguments();
            let tok_close = self.resume(&[TokenKind::RParen]);
            (Some(tok_open), arguments, Some(tok_close))
        } else {
            (None, SeparatedList::new(), None)
        };

        let mut location = tok_name.location.clone();
        if let Some(close) = &tok_close {
            location = location.merge(&close.location);
        }
        self.tree.alloc(
            Node::Attribute(AttributeNode {
                tok_name,
                tok_open,
                arguments,
                tok_close,
            }),
            location,
        )
    }
}

/// Scan and parse a source file
pub fn parse(filename: &str, source: &str) -> ParseResult {
    let (tokens, diagnostics) = Scanner::new(filename, source).scan();
    Parser::new(filename, tokens, diagnostics).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::Node;

    fn parse_ok(source: &str) -> SyntaxTree {
        let result = parse("test.orx", source);
        assert!(
            !result.diagnostics.has_errors(),
            "unexpected errors: {:?}",
            result.diagnostics.as_slice()
        );
        result.tree
    }

    #[test]
    fn test_parse_empty_module() {
        let tree = parse_ok("");
        match tree.node(tree.root()) {
            Node::Module(module) => {
                assert!(module.imports.is_empty());
                assert!(module.members.is_empty());
            }
            _ => panic!("expected module root"),
        }
    }

    #[test]
    fn test_parse_import_from() {
        let tree = parse_ok("from __builtins__ import int, bool as b\n");
        let Node::Module(module) = tree.node(tree.root()) else {
            panic!("expected module root");
        };
        assert_eq!(module.imports.len(), 1);
        let Node::ImportFrom(import) = tree.node(module.imports[0]) else {
            panic!("expected from-import");
        };
        let Node::QualifiedName(name) = tree.node(import.module) else {
            panic!("expected qualified name");
        };
        assert_eq!(name.text(), "__builtins__");
        assert_eq!(import.aliases.len(), 2);

        let Node::Alias(second) = tree.node(import.aliases.items[1]) else {
            panic!("expected alias");
        };
        assert_eq!(second.tok_alias.as_ref().unwrap().text, "b");
    }

    #[test]
    fn test_lossless_flatten() {
        let source = "from __builtins__ import int\n\ndef f(x: int) -> int:  # add one\n    return x + 1\n";
        let tree = parse_ok(source);
        assert_eq!(tree.text(tree.root()), source);
    }

    #[test]
    fn test_missing_token_reports_once() {
        // `def` without a name: one diagnostic for the error region
        let result = parse("test.orx", "def (x: int) -> int: ...\n");
        assert_eq!(result.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_recovery_continues_after_bad_import() {
        let result = parse("test.orx", "from import x\ndef f(): ...\n");
        assert!(result.diagnostics.has_errors());
        let Node::Module(module) = result.tree.node(result.tree.root()) else {
            panic!("expected module root");
        };
        // The function after the broken import still parses
        assert_eq!(module.members.len(), 1);
    }
}
