//! Embedded expression handling
//!
//! Scalars whose text starts with `=` carry a CEL-style expression. The
//! lexer turns one physical line into a flat token run; the parser groups
//! token runs into nested semantic nodes with delta positions.

mod lexer;
mod parser;

pub use lexer::{tokenize, Token, TokenKind, KEYWORD_FUNCTIONS};
pub use parser::{parse_expression, ExprLine};

use thiserror::Error;

/// Fatal expression errors. Anything else degrades into a default token
/// classification, but these two desynchronize all downstream position
/// deltas and must abort the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("Unterminated string literal")]
    UnterminatedString { line: u32, offset: u32 },
    #[error("Unmatched '{bracket}'")]
    UnmatchedBracket {
        bracket: char,
        line: u32,
        offset: u32,
    },
}

impl ExprError {
    /// Best-known absolute position for the diagnostic.
    pub fn position(&self) -> (u32, u32) {
        match *self {
            ExprError::UnterminatedString { line, offset } => (line, offset),
            ExprError::UnmatchedBracket { line, offset, .. } => (line, offset),
        }
    }

    /// Rebase a lexer-local error (line 0, offset within the lexed text)
    /// onto its absolute source location.
    pub fn rebased(self, line: u32, column: u32) -> Self {
        match self {
            ExprError::UnterminatedString { offset, .. } => ExprError::UnterminatedString {
                line,
                offset: column + offset,
            },
            ExprError::UnmatchedBracket {
                bracket, offset, ..
            } => ExprError::UnmatchedBracket {
                bracket,
                line,
                offset: column + offset,
            },
        }
    }
}
