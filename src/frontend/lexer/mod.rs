//! Lexer for the Quill programming language.
//!
//! Produces tokens on demand: `next_token` yields one token per call and
//! returns the `Eof` sentinel repeatedly at end of input; `peek_token` is
//! idempotent until the next `next_token`. Indentation is tracked with a
//! stack of widths, and block structure is surfaced as synthetic `Indent` /
//! `Dedent` / `Newline` tokens. The only buffered state besides the one-token
//! peek cache is the pending dedent count.

mod indent;
mod numbers;
mod strings;

use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::source::SourceLocation;
use crate::frontend::token::{Token, TokenKind, KEYWORDS};

pub struct Lexer<'a> {
    source: &'a str,
    filename: String,

    // Scanning position
    start: usize,
    start_loc: SourceLocation,
    current: usize,
    line: usize,
    column: usize,

    // Indentation tracking
    indent_stack: Vec<usize>,
    pending_dedents: usize,
    at_line_start: bool,
    /// Newlines inside brackets join logical lines instead of ending them.
    bracket_depth: usize,

    // One-token lookahead cache
    peeked: Option<Token>,

    errors: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: impl Into<String>) -> Self {
        Self {
            source,
            filename: filename.into(),
            start: 0,
            start_loc: SourceLocation::start(),
            current: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            peeked: None,
            errors: Vec::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.errors)
    }

    /// Produce the next token. At end of input this returns the `Eof`
    /// sentinel, and keeps returning it on every subsequent call.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.scan_token()
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Token {
        if let Some(token) = &self.peeked {
            return token.clone();
        }
        let token = self.scan_token();
        self.peeked = Some(token.clone());
        token
    }

    /// Tokenize the entire input, ending with exactly one `Eof`.
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    // ========================================================================
    // Source navigation
    // ========================================================================

    pub(super) fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    pub(super) fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    pub(super) fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn here(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.current)
    }

    /// Whether the raw input is exhausted. Synthetic layout tokens may still
    /// be pending after this turns true.
    pub fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    // ========================================================================
    // Token construction
    // ========================================================================

    pub(super) fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, &self.source[self.start..self.current], self.start_loc)
    }

    /// Layout markers and sentinels carry an empty lexeme.
    fn synthetic(&self, kind: TokenKind, location: SourceLocation) -> Token {
        Token::new(kind, "", location)
    }

    pub(super) fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.errors.push(Diagnostic::new(message, location));
    }

    /// Record a lex error and return an error token covering the bad slice.
    /// Error tokens flow into the stream so the parser can resynchronize.
    pub(super) fn error_token(&mut self, message: impl Into<String>) -> Token {
        self.error(message, self.start_loc);
        Token::new(TokenKind::Error, &self.source[self.start..self.current], self.start_loc)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    fn scan_token(&mut self) -> Token {
        loop {
            if self.pending_dedents > 0 {
                self.pending_dedents -= 1;
                return self.synthetic(TokenKind::Dedent, self.here());
            }

            if self.at_line_start {
                if let Some(token) = self.scan_line_start() {
                    return token;
                }
                continue;
            }

            self.skip_inline_whitespace();
            self.start = self.current;
            self.start_loc = self.here();

            let Some(c) = self.advance() else {
                // Close any open blocks before the end-of-input sentinel.
                if self.indent_stack.len() > 1 {
                    self.pending_dedents = self.indent_stack.len() - 1;
                    self.indent_stack.truncate(1);
                    continue;
                }
                return self.synthetic(TokenKind::Eof, self.start_loc);
            };

            match c {
                '#' => {
                    self.skip_comment();
                    continue;
                }
                '\n' => {
                    // Inside brackets the newline joins logical lines: no
                    // line-break token, and the indentation rule stays off.
                    if self.bracket_depth > 0 {
                        continue;
                    }
                    self.at_line_start = true;
                    return self.synthetic(TokenKind::Newline, self.start_loc);
                }

                '+' => {
                    return if self.match_char('=') {
                        self.make_token(TokenKind::PlusEq)
                    } else {
                        self.make_token(TokenKind::Plus)
                    };
                }
                '-' => {
                    return if self.match_char('>') {
                        self.make_token(TokenKind::Arrow)
                    } else if self.match_char('=') {
                        self.make_token(TokenKind::MinusEq)
                    } else {
                        self.make_token(TokenKind::Minus)
                    };
                }
                '*' => {
                    return if self.match_char('*') {
                        self.make_token(TokenKind::StarStar)
                    } else if self.match_char('=') {
                        self.make_token(TokenKind::StarEq)
                    } else {
                        self.make_token(TokenKind::Star)
                    };
                }
                '/' => {
                    return if self.match_char('=') {
                        self.make_token(TokenKind::SlashEq)
                    } else {
                        self.make_token(TokenKind::Slash)
                    };
                }
                '%' => {
                    return if self.match_char('=') {
                        self.make_token(TokenKind::PercentEq)
                    } else {
                        self.make_token(TokenKind::Percent)
                    };
                }
                '=' => {
                    return if self.match_char('=') {
                        self.make_token(TokenKind::EqEq)
                    } else if self.match_char('>') {
                        self.make_token(TokenKind::FatArrow)
                    } else {
                        self.make_token(TokenKind::Eq)
                    };
                }
                '!' => {
                    return if self.match_char('=') {
                        self.make_token(TokenKind::NotEq)
                    } else {
                        self.error_token("Unexpected character '!'")
                    };
                }
                '<' => {
                    return if self.match_char('<') {
                        self.make_token(TokenKind::Shl)
                    } else if self.match_char('=') {
                        self.make_token(TokenKind::LtEq)
                    } else {
                        self.make_token(TokenKind::Lt)
                    };
                }
                '>' => {
                    return if self.match_char('>') {
                        self.make_token(TokenKind::Shr)
                    } else if self.match_char('=') {
                        self.make_token(TokenKind::GtEq)
                    } else {
                        self.make_token(TokenKind::Gt)
                    };
                }
                '&' => return self.make_token(TokenKind::Amp),
                '|' => return self.make_token(TokenKind::Pipe),
                '^' => return self.make_token(TokenKind::Caret),
                '~' => return self.make_token(TokenKind::Tilde),
                '?' => return self.make_token(TokenKind::Question),
                '@' => return self.make_token(TokenKind::At),
                ',' => return self.make_token(TokenKind::Comma),
                ';' => return self.make_token(TokenKind::Semicolon),
                ':' => {
                    return if self.match_char(':') {
                        self.make_token(TokenKind::ColonColon)
                    } else {
                        self.make_token(TokenKind::Colon)
                    };
                }
                '.' => {
                    return if self.match_char('.') {
                        if self.match_char('.') {
                            self.make_token(TokenKind::Ellipsis)
                        } else {
                            self.make_token(TokenKind::DotDot)
                        }
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.scan_number('.')
                    } else {
                        self.make_token(TokenKind::Dot)
                    };
                }

                '(' => {
                    self.bracket_depth += 1;
                    return self.make_token(TokenKind::LParen);
                }
                ')' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return self.make_token(TokenKind::RParen);
                }
                '[' => {
                    self.bracket_depth += 1;
                    return self.make_token(TokenKind::LBracket);
                }
                ']' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return self.make_token(TokenKind::RBracket);
                }
                '{' => {
                    self.bracket_depth += 1;
                    return self.make_token(TokenKind::LBrace);
                }
                '}' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return self.make_token(TokenKind::RBrace);
                }

                '"' | '\'' => return self.scan_string(c),
                'f' | 'F' => {
                    // An f-string prefix is accepted; its body lexes as a
                    // plain string literal for now.
                    if let Some(quote @ ('"' | '\'')) = self.peek() {
                        self.advance();
                        return self.scan_string(quote);
                    }
                    return self.scan_identifier();
                }

                '0'..='9' => return self.scan_number(c),

                c if c.is_ascii_alphabetic() || c == '_' => return self.scan_identifier(),

                _ => return self.error_token(format!("Unexpected character '{}'", c)),
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[self.start..self.current];
        let kind = KEYWORDS.get(text).copied().unwrap_or(TokenKind::Ident);
        self.make_token(kind)
    }

    /// Skip spaces, tabs, carriage returns, and backslash-newline line
    /// continuations. Does not cross logical line ends.
    fn skip_inline_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\\') if self.peek_next() == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    pub(super) fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut lexer = Lexer::new(source, "<test>");
        let tokens = lexer.tokenize_all();
        (tokens, lexer.take_errors())
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_is_a_single_eof() {
        let (tokens, errors) = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(errors.is_empty());
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("", "<test>");
        assert!(lexer.next_token().is_eof());
        assert!(lexer.next_token().is_eof());
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn peek_is_idempotent() {
        let mut lexer = Lexer::new("let x", "<test>");
        let first = lexer.peek_token();
        let second = lexer.peek_token();
        assert_eq!(first, second);
        assert_eq!(lexer.next_token(), first);
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
    }

    #[test]
    fn keywords_and_identifiers() {
        let (tokens, _) = lex("fn let var const struct spawn foo_1 Self self");
        let expect = [
            TokenKind::Fn,
            TokenKind::Let,
            TokenKind::Var,
            TokenKind::Const,
            TokenKind::Struct,
            TokenKind::Spawn,
            TokenKind::Ident,
            TokenKind::SelfType,
            TokenKind::SelfKw,
            TokenKind::Eof,
        ];
        assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), expect);
        assert_eq!(tokens[6].lexeme, "foo_1");
    }

    #[test]
    fn multi_char_operators_are_longest_match() {
        let got = kinds("** == != <= >= << >> -> => :: .. ... += -= *= /= %=");
        let expect = [
            TokenKind::StarStar,
            TokenKind::EqEq,
            TokenKind::NotEq,
            TokenKind::LtEq,
            TokenKind::GtEq,
            TokenKind::Shl,
            TokenKind::Shr,
            TokenKind::Arrow,
            TokenKind::FatArrow,
            TokenKind::ColonColon,
            TokenKind::DotDot,
            TokenKind::Ellipsis,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::PercentEq,
            TokenKind::Eof,
        ];
        assert_eq!(got, expect);
    }

    #[test]
    fn bare_bang_is_a_lex_error() {
        let (tokens, errors) = lex("!");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'!'"));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let got = kinds("x # a comment\ny");
        assert_eq!(
            got,
            [TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn backslash_newline_joins_lines() {
        let got = kinds("1 + \\\n2");
        assert_eq!(
            got,
            [TokenKind::Int, TokenKind::Plus, TokenKind::Int, TokenKind::Eof]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        let got = kinds("f(\n  1,\n  2\n)");
        assert_eq!(
            got,
            [
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Int,
                TokenKind::Comma,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn indent_dedent_pairing() {
        let source = "fn f():\n    x = 1\n    y = 2\nz = 3\n";
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty());
        let opens = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let closes = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(opens, 1);
        assert_eq!(closes, 1);
    }

    #[test]
    fn dedents_are_closed_at_eof() {
        let source = "fn f():\n    if x:\n        y\n";
        let (tokens, _) = lex(source);
        let opens = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let closes = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(opens, 2);
        assert_eq!(closes, 2);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn blank_and_comment_lines_do_not_change_indentation() {
        let source = "fn f():\n    a\n\n    # note\n    b\n";
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty());
        let opens = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let closes = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(opens, 1);
        assert_eq!(closes, 1);
    }

    #[test]
    fn inconsistent_indentation_is_reported_but_not_fatal() {
        let source = "fn f():\n        a\n    b\n";
        let (tokens, errors) = lex(source);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Inconsistent indentation"));
        // The stack is not corrupted: the stream still closes every block.
        let opens = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let closes = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn tabs_count_as_four_columns_of_indentation() {
        let source = "fn f():\n\tx\n";
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Indent));
    }

    #[test]
    fn crlf_is_treated_as_a_plain_newline() {
        let got = kinds("x\r\ny");
        assert_eq!(
            got,
            [TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn lexemes_are_exact_source_slices() {
        let source = "fn add(a: i32) -> i32:\n    return a ** 2\n";
        let (tokens, _) = lex(source);
        for token in &tokens {
            if token.lexeme.is_empty() {
                continue; // synthetic layout markers and sentinels
            }
            let start = token.location.offset;
            assert_eq!(
                &source[start..start + token.lexeme.len()],
                token.lexeme,
                "lexeme mismatch for {:?}",
                token
            );
        }
    }

    #[test]
    fn locations_are_one_based() {
        let (tokens, _) = lex("a\nbb ccc");
        assert_eq!((tokens[0].location.line, tokens[0].location.column), (1, 1));
        // tokens[1] is the newline
        assert_eq!((tokens[2].location.line, tokens[2].location.column), (2, 1));
        assert_eq!((tokens[3].location.line, tokens[3].location.column), (2, 4));
    }
}
