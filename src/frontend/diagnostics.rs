//! Diagnostics for the Quill front-end.
//!
//! Errors are collected, never thrown across component boundaries: each of
//! the lexer, parser, and type checker appends to its own list and keeps
//! producing a best-effort result.

use crate::frontend::source::SourceLocation;

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self { message: message.into(), location }
    }

    /// Render as `FILE:LINE:COL: error: MESSAGE`.
    pub fn render(&self, filename: &str) -> String {
        format!(
            "{}:{}:{}: error: {}",
            filename, self.location.line, self.location.column, self.message
        )
    }
}

/// Print a batch of diagnostics to stderr in source order.
pub fn report_all(filename: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.render(filename));
    }
}
