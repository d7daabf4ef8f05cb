//! String literal scanning.
//!
//! A single or double quote opens a literal that must close on the same
//! physical line; tripling the opener permits embedded newlines. Recognized
//! escapes are decoded, any other escape is retained literally.

use crate::frontend::token::Token;

impl<'a> super::Lexer<'a> {
    /// Scan a string literal. The opening quote (and any `f` prefix) has
    /// already been consumed; `quote` is the opener character. The location
    /// was captured at the literal's start, so diagnostics for strings that
    /// span lines still point at the opening quote.
    pub(super) fn scan_string(&mut self, quote: char) -> Token {
        let triple = self.peek() == Some(quote) && self.peek_next() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        let mut terminated = false;

        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                if !triple {
                    terminated = true;
                    break;
                }
                // Triple-quoted: need three in a row to close.
                if self.peek() == Some(quote) {
                    self.advance();
                    if self.peek() == Some(quote) {
                        self.advance();
                        terminated = true;
                        break;
                    }
                    value.push(quote);
                    value.push(quote);
                } else {
                    value.push(quote);
                }
            } else if c == '\n' && !triple {
                // Leave the newline for layout handling.
                break;
            } else if c == '\\' {
                self.advance();
                match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('0') => value.push('\0'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                }
            } else {
                value.push(c);
                self.advance();
            }
        }

        if !terminated {
            return self.error_token("Unterminated string");
        }

        let text = &self.source[self.start..self.current];
        Token::with_str(text, self.start_loc, value)
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::lexer::Lexer;
    use crate::frontend::token::TokenKind;

    fn lex_one(source: &str) -> (crate::frontend::token::Token, usize) {
        let mut lexer = Lexer::new(source, "<test>");
        let tokens = lexer.tokenize_all();
        (tokens[0].clone(), lexer.errors().len())
    }

    #[test]
    fn simple_strings() {
        let (tok, errs) = lex_one(r#""hello""#);
        assert_eq!(tok.string_value(), Some("hello"));
        assert_eq!(tok.lexeme, r#""hello""#);
        assert_eq!(errs, 0);

        let (tok, _) = lex_one("'world'");
        assert_eq!(tok.string_value(), Some("world"));
    }

    #[test]
    fn escapes_decode() {
        let (tok, _) = lex_one(r#""a\nb\t\\\"\0""#);
        assert_eq!(tok.string_value(), Some("a\nb\t\\\"\0"));
    }

    #[test]
    fn unknown_escape_is_kept_literally() {
        let (tok, errs) = lex_one(r#""\q""#);
        assert_eq!(tok.string_value(), Some("\\q"));
        assert_eq!(errs, 0);
    }

    #[test]
    fn triple_quoted_spans_lines() {
        let (tok, errs) = lex_one("\"\"\"line one\nline two\"\"\"");
        assert_eq!(tok.string_value(), Some("line one\nline two"));
        assert_eq!(errs, 0);
        // Location still points at the opening quote.
        assert_eq!(tok.location.line, 1);
        assert_eq!(tok.location.column, 1);
    }

    #[test]
    fn lone_quote_inside_triple_is_content() {
        let (tok, _) = lex_one("\"\"\"a\"b\"\"\"");
        assert_eq!(tok.string_value(), Some("a\"b"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let (tok, errs) = lex_one("\"oops\nnext");
        assert_eq!(tok.kind, TokenKind::Error);
        assert_eq!(errs, 1);
    }

    #[test]
    fn fstring_prefix_lexes_as_plain_string() {
        let (tok, errs) = lex_one(r#"f"hi {name}""#);
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.string_value(), Some("hi {name}"));
        assert_eq!(tok.lexeme, r#"f"hi {name}""#);
        assert_eq!(errs, 0);
    }
}
