//! Indentation handling: the block-structure state machine.
//!
//! At the first non-blank, non-comment character of each line, the line's
//! indentation width is compared against the stack top: greater pushes the
//! width and emits one `Indent`; smaller pops while the top exceeds the
//! width, emitting one `Dedent` per pop. The stack always keeps `0` at its
//! base, so a line can never pop past column zero.

use crate::frontend::token::{Token, TokenKind};

impl<'a> super::Lexer<'a> {
    /// Run the indentation rule at the start of a line.
    ///
    /// Returns the layout token to emit, or `None` when the line introduces
    /// no block change (including blank and comment-only lines, which leave
    /// the stack untouched). Extra dedents are left in `pending_dedents`.
    pub(super) fn scan_line_start(&mut self) -> Option<Token> {
        let mut width = 0;
        loop {
            match self.peek() {
                Some(' ') => {
                    width += 1;
                    self.advance();
                }
                Some('\t') => {
                    // A tab contributes four columns to indentation width.
                    width += 4;
                    self.advance();
                }
                Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    self.skip_comment();
                }
                Some('\n') => {
                    // Blank or comment-only line: stay at line start.
                    self.advance();
                    width = 0;
                }
                Some(_) => break,
                None => {
                    self.at_line_start = false;
                    return None;
                }
            }
        }

        self.at_line_start = false;
        let location = self.here();
        let top = self.indent_stack.last().copied().unwrap_or(0);

        if width > top {
            self.indent_stack.push(width);
            return Some(Token::new(TokenKind::Indent, "", location));
        }

        if width < top {
            let mut closes = 0;
            while self.indent_stack.last().copied().unwrap_or(0) > width {
                self.indent_stack.pop();
                closes += 1;
            }
            if self.indent_stack.is_empty() {
                self.indent_stack.push(0);
            }

            let landed = self.indent_stack.last().copied().unwrap_or(0);
            if landed != width {
                self.error(
                    format!("Inconsistent indentation: expected {} spaces, got {}", landed, width),
                    location,
                );
            }

            if closes > 0 {
                self.pending_dedents = closes - 1;
                return Some(Token::new(TokenKind::Dedent, "", location));
            }
        }

        None
    }
}
