//! Relative/absolute position arithmetic
//!
//! Source positions flow through the indexer in two flavors: absolute
//! `(line, offset)` pairs as reported by the YAML scanner, and deltas
//! relative to a reference point (the previously emitted token, or the
//! owning document anchor). The delta rule is asymmetric: moving to a new
//! line resets the column, so the offset of a cross-line delta is the
//! absolute column rather than a difference.

use tower_lsp::lsp_types;

/// A `(line, offset)` pair. Whether it is absolute or relative depends on
/// context; the arithmetic below converts between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, offset: u32) -> Self {
        Self { line, offset }
    }

    /// Compute this absolute position as a delta from `reference`.
    ///
    /// Same line: the offset is a column difference. Different line: the
    /// offset is carried over absolute, because the column counter resets
    /// at each newline in delta-encoded output.
    pub fn relative_to(self, reference: Position) -> Position {
        if self.line == reference.line {
            Position {
                line: 0,
                offset: self.offset.saturating_sub(reference.offset),
            }
        } else {
            Position {
                line: self.line.saturating_sub(reference.line),
                offset: self.offset,
            }
        }
    }

    /// Resolve this delta against an absolute `base`, inverting
    /// [`Position::relative_to`].
    pub fn resolve(self, base: Position) -> Position {
        if self.line == 0 {
            Position {
                line: base.line,
                offset: base.offset + self.offset,
            }
        } else {
            Position {
                line: base.line + self.line,
                offset: self.offset,
            }
        }
    }

    pub fn to_lsp(self) -> lsp_types::Position {
        lsp_types::Position {
            line: self.line,
            character: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_line_delta() {
        let token = Position::new(3, 10);
        let previous = Position::new(3, 4);
        assert_eq!(token.relative_to(previous), Position::new(0, 6));
    }

    #[test]
    fn test_cross_line_delta_keeps_absolute_column() {
        let token = Position::new(5, 2);
        let previous = Position::new(3, 40);
        assert_eq!(token.relative_to(previous), Position::new(2, 2));
    }

    #[test]
    fn test_resolve_inverts_relative_to() {
        let cases = [
            (Position::new(0, 0), Position::new(0, 0)),
            (Position::new(2, 7), Position::new(2, 3)),
            (Position::new(4, 1), Position::new(2, 9)),
            (Position::new(10, 30), Position::new(10, 12)),
        ];
        for (abs, base) in cases {
            assert_eq!(abs.relative_to(base).resolve(base), abs);
        }
    }

    #[test]
    fn test_chained_deltas_reproduce_absolute() {
        // Summing deltas along a token chain must land on the raw position.
        let tokens = [
            Position::new(0, 2),
            Position::new(0, 8),
            Position::new(1, 4),
            Position::new(1, 9),
            Position::new(3, 0),
        ];
        let mut previous = Position::new(0, 0);
        let mut reconstructed = Position::new(0, 0);
        for token in tokens {
            let delta = token.relative_to(previous);
            reconstructed = delta.resolve(reconstructed);
            assert_eq!(reconstructed, token);
            previous = token;
        }
    }
}
