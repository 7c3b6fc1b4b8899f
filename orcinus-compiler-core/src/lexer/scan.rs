// Scanner (tokenizer) for Orcinus
//
// A hand-written scanner that:
// - Tokenizes source into a stream of tokens ending with Eof
// - Implements the indentation contract: explicit Newline/Indent/Dedent
//   tokens driven by an indent stack, with blank and comment-only lines
//   producing no layout tokens
// - Suppresses layout inside brackets (implicit line joining)
// - Attaches skipped whitespace and comments to the next token as trivia,
//   so the token stream flattens back to the original text
// - Recovers from errors by emitting Error tokens and continuing

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::source::{Location, Span};

use super::{Token, TokenKind};

/// Width of a tab stop when measuring indentation
const TAB_WIDTH: u32 = 8;

/// Scanner state
pub struct Scanner<'a> {
    filename: String,
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    diagnostics: Diagnostics,
    /// Stack of indentation widths; always starts with 0
    indents: Vec<u32>,
    /// Depth of open ( and [ brackets; layout is suppressed inside
    bracket_depth: usize,
    /// True before the first token of a logical line has been produced
    at_line_start: bool,
    /// True when the current line has produced at least one token
    line_has_content: bool,
    /// Whitespace and comments accumulated for the next token
    trivia: String,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given file
    pub fn new(filename: impl Into<String>, source: &'a str) -> Self {
        Self {
            filename: filename.into(),
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            diagnostics: Diagnostics::new(),
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            line_has_content: false,
            trivia: String::new(),
        }
    }

    /// Tokenize the entire source and return tokens + diagnostics
    pub fn scan(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                self.handle_line_start(&mut tokens);
            }
            self.skip_inline_trivia();

            let start = self.current_pos;
            let Some(ch) = self.peek() else {
                self.finish(&mut tokens);
                break;
            };

            let token = match ch {
                '\n' => {
                    self.advance();
                    if self.bracket_depth > 0 {
                        self.trivia.push('\n');
                        continue;
                    }
                    self.at_line_start = true;
                    self.line_has_content = false;
                    self.make(TokenKind::Newline, start)
                }
                'a'..='z' | 'A'..='Z' | '_' => self.lex_name(start),
                '0'..='9' => self.lex_number(start),
                '"' => self.lex_string(start),
                '(' => {
                    self.bracket_depth += 1;
                    self.single(TokenKind::LParen, start)
                }
                ')' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    self.single(TokenKind::RParen, start)
                }
                '[' => {
                    self.bracket_depth += 1;
                    self.single(TokenKind::LBracket, start)
                }
                ']' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    self.single(TokenKind::RBracket, start)
                }
                ':' => self.single(TokenKind::Colon, start),
                ',' => self.single(TokenKind::Comma, start),
                '+' => self.single(TokenKind::Plus, start),
                '~' => self.single(TokenKind::Tilde, start),
                '=' => self.single(TokenKind::Equals, start),
                '-' => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self.make(TokenKind::Arrow, start)
                    } else {
                        self.make(TokenKind::Minus, start)
                    }
                }
                '*' => {
                    self.advance();
                    if self.peek() == Some('*') {
                        self.advance();
                        self.make(TokenKind::StarStar, start)
                    } else {
                        self.make(TokenKind::Star, start)
                    }
                }
                '/' => {
                    self.advance();
                    if self.peek() == Some('/') {
                        self.advance();
                        self.make(TokenKind::SlashSlash, start)
                    } else {
                        self.make(TokenKind::Slash, start)
                    }
                }
                '.' => {
                    self.advance();
                    if self.peek() == Some('.') && self.peek_nth(1) == Some('.') {
                        self.advance();
                        self.advance();
                        self.make(TokenKind::Ellipsis, start)
                    } else {
                        self.make(TokenKind::Dot, start)
                    }
                }
                _ => {
                    self.advance();
                    self.diagnostics.add(Diagnostic::error(
                        format!("unexpected character '{}'", ch),
                        self.location(start),
                    ));
                    self.make(TokenKind::Error, start)
                }
            };

            if !matches!(token.kind, TokenKind::Newline) {
                self.line_has_content = true;
            }
            tokens.push(token);
        }

        (tokens, self.diagnostics)
    }

    // --- Character operations ---

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.current_pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let next = self.chars.next();
        if let Some((pos, ch)) = next {
            self.current_pos = pos + ch.len_utf8();
        }
        next.map(|(_, c)| c)
    }

    fn location(&self, start: usize) -> Location {
        Location::new(
            self.filename.clone(),
            Span::new(start as u32, self.current_pos as u32),
        )
    }

    fn make(&mut self, kind: TokenKind, start: usize) -> Token {
        let source = self.source;
        let text = &source[start..self.current_pos];
        let trivia = std::mem::take(&mut self.trivia);
        Token::new(kind, text, trivia, self.location(start))
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        self.make(kind, start)
    }

    /// Zero-width layout token (Indent/Dedent, or synthesized Newline at EOF)
    fn layout(&mut self, kind: TokenKind) -> Token {
        let trivia = std::mem::take(&mut self.trivia);
        let pos = self.current_pos;
        Token::new(kind, "", trivia, self.location(pos))
    }

    // --- Layout handling ---

    /// Measure the indentation of the next logical line and emit
    /// Indent/Dedent tokens; blank and comment-only lines are skipped.
    fn handle_line_start(&mut self, tokens: &mut Vec<Token>) {
        loop {
            let mut width = 0u32;
            while let Some(ch) = self.peek() {
                match ch {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\r' => {}
                    _ => break,
                }
                self.trivia.push(ch);
                self.advance();
            }

            match self.peek() {
                None => return,
                Some('\n') => {
                    self.trivia.push('\n');
                    self.advance();
                }
                Some('#') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.trivia.push(ch);
                        self.advance();
                    }
                }
                Some(_) => {
                    self.adjust_indent(width, tokens);
                    self.at_line_start = false;
                    return;
                }
            }
        }
    }

    fn adjust_indent(&mut self, width: u32, tokens: &mut Vec<Token>) {
        let top = *self.indents.last().unwrap_or(&0);
        if width > top {
            self.indents.push(width);
            tokens.push(self.layout(TokenKind::Indent));
            return;
        }
        while width < *self.indents.last().unwrap_or(&0) {
            self.indents.pop();
            tokens.push(self.layout(TokenKind::Dedent));
        }
        if width != *self.indents.last().unwrap_or(&0) {
            self.diagnostics.add(Diagnostic::error(
                "unindent does not match any outer indentation level",
                self.location(self.current_pos),
            ));
        }
    }

    /// Emit the synthesized trailing Newline, the closing Dedents, and Eof
    fn finish(&mut self, tokens: &mut Vec<Token>) {
        if self.line_has_content {
            tokens.push(self.layout(TokenKind::Newline));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            tokens.push(self.layout(TokenKind::Dedent));
        }
        tokens.push(self.layout(TokenKind::Eof));
    }

    // --- Trivia ---

    fn skip_inline_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.trivia.push(ch);
                    self.advance();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.trivia.push(c);
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // --- Literals and names ---

    fn lex_name(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let source = self.source;
        let text = &source[start..self.current_pos];
        let kind = TokenKind::keyword_from_str(text).unwrap_or(TokenKind::Name);
        self.make(kind, start)
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.make(TokenKind::Number, start)
    }

    fn lex_string(&mut self, start: usize) -> Token {
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.diagnostics.add(Diagnostic::error(
                        "unterminated string literal",
                        self.location(start),
                    ));
                    return self.make(TokenKind::Error, start);
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return self.make(TokenKind::String, start);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        Scanner::new("test.orx", source).scan()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1\n"),
            vec![Name, Equals, Number, Newline, Eof]
        );
    }

    #[test]
    fn test_keywords_and_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("def f() -> int: ...\n"),
            vec![Def, Name, LParen, RParen, Arrow, Name, Colon, Ellipsis, Newline, Eof]
        );
    }

    #[test]
    fn test_indent_dedent() {
        use TokenKind::*;
        let source = "def f():\n    pass\n";
        assert_eq!(
            kinds(source),
            vec![Def, Name, LParen, RParen, Colon, Newline, Indent, Pass, Newline, Dedent, Eof]
        );
    }

    #[test]
    fn test_nested_blocks() {
        use TokenKind::*;
        let source = "if x:\n    if y:\n        pass\npass\n";
        let got = kinds(source);
        let indents = got.iter().filter(|k| **k == Indent).count();
        let dedents = got.iter().filter(|k| **k == Dedent).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        assert_eq!(*got.last().unwrap(), Eof);
    }

    #[test]
    fn test_blank_and_comment_lines_produce_no_layout() {
        use TokenKind::*;
        let source = "x = 1\n\n# comment\ny = 2\n";
        assert_eq!(
            kinds(source),
            vec![Name, Equals, Number, Newline, Name, Equals, Number, Newline, Eof]
        );
    }

    #[test]
    fn test_brackets_join_lines() {
        use TokenKind::*;
        let source = "f(1,\n  2)\n";
        assert_eq!(
            kinds(source),
            vec![Name, LParen, Number, Comma, Number, RParen, Newline, Eof]
        );
    }

    #[test]
    fn test_missing_trailing_newline_is_synthesized() {
        use TokenKind::*;
        assert_eq!(kinds("pass"), vec![Pass, Newline, Eof]);
    }

    #[test]
    fn test_trivia_round_trip() {
        let source = "def f(x: int) -> int:  # doc\n    return x + 1\n\npass\n";
        let (tokens, diags) = scan(source);
        assert!(!diags.has_errors());
        let mut rebuilt = String::new();
        for token in &tokens {
            rebuilt.push_str(&token.trivia);
            rebuilt.push_str(&token.text);
        }
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_string_literal() {
        let (tokens, diags) = scan("x = \"hi\\\"there\"\n");
        assert!(!diags.has_errors());
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, "\"hi\\\"there\"");
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, diags) = scan("x = \"oops\n");
        assert!(diags.has_errors());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
    }

    #[test]
    fn test_bad_indentation() {
        let source = "if x:\n        pass\n    pass\n";
        let (_, diags) = scan(source);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_unexpected_character() {
        let (tokens, diags) = scan("x = $\n");
        assert!(diags.has_errors());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
    }
}
