//! Numeric literal scanning.
//!
//! `0x`/`0b`/`0o` prefixes select hexadecimal, binary, and octal integers;
//! anything else is decimal. A `.` followed by a digit, a trailing `.`, or an
//! `e`/`E` exponent promotes the literal to floating point. Integers are
//! 64-bit signed; overflow is a lex error. Underscores are allowed as digit
//! separators and stripped from the parsed value.

use crate::frontend::token::Token;

impl<'a> super::Lexer<'a> {
    /// Scan a numeric literal. `first` is the character already consumed,
    /// either a digit or the `.` of a leading-dot float. The starting column
    /// was captured before the literal was consumed, so multi-character
    /// literals report the right location.
    pub(super) fn scan_number(&mut self, first: char) -> Token {
        if first == '0' {
            match self.peek() {
                Some('x') | Some('X') => {
                    return self.scan_radix(16, "hexadecimal", |c| c.is_ascii_hexdigit());
                }
                Some('b') | Some('B') => {
                    return self.scan_radix(2, "binary", |c| c == '0' || c == '1');
                }
                Some('o') | Some('O') => {
                    return self.scan_radix(8, "octal", |c| ('0'..='7').contains(&c));
                }
                _ => {}
            }
        }

        let mut is_float = first == '.';
        self.consume_digits();

        // Fractional part: `1.5`, or a trailing dot as in `5.`. Two dots in a
        // row belong to a range expression and are left alone.
        if !is_float && self.peek() == Some('.') && self.peek_next() != Some('.') {
            self.advance();
            is_float = true;
            self.consume_digits();
        }

        // Exponent, optionally signed.
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            self.consume_digits();
        }

        let text = &self.source[self.start..self.current];
        let digits: String = text.chars().filter(|c| *c != '_').collect();

        if is_float {
            match digits.parse::<f64>() {
                Ok(value) => Token::with_float(text, self.start_loc, value),
                Err(_) => self.error_token("Invalid floating-point literal"),
            }
        } else {
            match digits.parse::<i64>() {
                Ok(value) => Token::with_int(text, self.start_loc, value),
                Err(_) => self.error_token("Integer literal out of range"),
            }
        }
    }

    fn scan_radix(&mut self, radix: u32, label: &str, is_digit: fn(char) -> bool) -> Token {
        self.advance(); // base marker
        let digits_start = self.current;
        while let Some(c) = self.peek() {
            if is_digit(c) || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let digits: String = self.source[digits_start..self.current]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if digits.is_empty() {
            return self.error_token(format!("Invalid {} literal", label));
        }

        match i64::from_str_radix(&digits, radix) {
            Ok(value) => {
                let text = &self.source[self.start..self.current];
                Token::with_int(text, self.start_loc, value)
            }
            Err(_) => self.error_token("Integer literal out of range"),
        }
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::lexer::Lexer;
    use crate::frontend::token::TokenKind;

    fn first_token(source: &str) -> (crate::frontend::token::Token, usize) {
        let mut lexer = Lexer::new(source, "<test>");
        let tokens = lexer.tokenize_all();
        (tokens[0].clone(), lexer.errors().len())
    }

    #[test]
    fn decimal_integers() {
        let (tok, errs) = first_token("1234");
        assert_eq!(tok.int_value(), Some(1234));
        assert_eq!(errs, 0);
    }

    #[test]
    fn underscore_separators() {
        let (tok, _) = first_token("1_000_000");
        assert_eq!(tok.int_value(), Some(1_000_000));
        assert_eq!(tok.lexeme, "1_000_000");
    }

    #[test]
    fn alternate_bases() {
        assert_eq!(first_token("0xFF").0.int_value(), Some(255));
        assert_eq!(first_token("0b1010").0.int_value(), Some(10));
        assert_eq!(first_token("0o17").0.int_value(), Some(15));
        assert_eq!(first_token("0X_ff").0.int_value(), Some(255));
    }

    #[test]
    fn base_prefix_without_digits_is_an_error() {
        let (tok, errs) = first_token("0x");
        assert_eq!(tok.kind, TokenKind::Error);
        assert_eq!(errs, 1);
    }

    #[test]
    fn overflow_is_a_lex_error() {
        let (tok, errs) = first_token("9223372036854775808");
        assert_eq!(tok.kind, TokenKind::Error);
        assert_eq!(errs, 1);
        assert_eq!(first_token("9223372036854775807").0.int_value(), Some(i64::MAX));
    }

    #[test]
    fn floats() {
        assert_eq!(first_token("3.14").0.float_value(), Some(3.14));
        assert_eq!(first_token("1e3").0.float_value(), Some(1000.0));
        assert_eq!(first_token("2E-2").0.float_value(), Some(0.02));
        assert_eq!(first_token(".5").0.float_value(), Some(0.5));
        assert_eq!(first_token("5.").0.float_value(), Some(5.0));
    }

    #[test]
    fn range_after_integer_is_not_a_float() {
        let mut lexer = Lexer::new("0..10", "<test>");
        let tokens = lexer.tokenize_all();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TokenKind::Int, TokenKind::DotDot, TokenKind::Int, TokenKind::Eof]
        );
    }

    #[test]
    fn literal_location_points_at_its_start() {
        let mut lexer = Lexer::new("x 12345", "<test>");
        let tokens = lexer.tokenize_all();
        assert_eq!(tokens[1].location.column, 3);
        assert_eq!(tokens[1].location.offset, 2);
    }
}
