//! Position-tracked semantic tree
//!
//! One [`SemanticAnchor`] is produced per top-level YAML document. Its
//! children form a tree of [`SemanticBlock`] groupings and [`SemanticNode`]
//! leaf tokens. Every node stores two deltas: `position`, relative to the
//! previously emitted token (the delta-encoded highlighting order), and
//! `anchor_rel`, relative to the owning anchor (for range reconstruction in
//! the index builders). Absolute positions are never stored per node; they
//! are recomputed on demand.

pub mod encode;
pub mod extract;
pub mod index;

use tower_lsp::lsp_types::DiagnosticSeverity;

use crate::position::Position;
use crate::tokens::{TokenModifier, TokenType};

/// A diagnostic annotation attached to the node that triggered it. The
/// absolute range is resolved at read time by the diagnostics extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDiagnostic {
    pub message: String,
    pub severity: DiagnosticSeverity,
}

/// A leaf token.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticNode {
    /// Intra-document lookup key, e.g. `label:deploy`.
    pub local_key: Option<String>,
    /// Cross-document lookup key, e.g. `Function:deploy`.
    pub index_key: Option<String>,
    /// Delta from the previously emitted token.
    pub position: Position,
    /// Delta from the owning anchor. Kept separately because multi-line
    /// values need both deltas.
    pub anchor_rel: Position,
    pub length: u32,
    pub node_type: TokenType,
    pub modifiers: Vec<TokenModifier>,
    pub diagnostic: Option<NodeDiagnostic>,
    /// Compound values (multi-line scalars, expression trees under a key)
    /// that still act as one indexable unit.
    pub children: Vec<Semantics>,
}

impl SemanticNode {
    pub fn leaf(
        node_type: TokenType,
        position: Position,
        anchor_rel: Position,
        length: u32,
    ) -> Self {
        Self {
            local_key: None,
            index_key: None,
            position,
            anchor_rel,
            length,
            node_type,
            modifiers: Vec::new(),
            diagnostic: None,
            children: Vec::new(),
        }
    }
}

/// An anchor-relative start/end pair covering a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: Position,
    pub end: Position,
}

/// A non-leaf grouping: a YAML mapping/sequence, a bracketed expression, or
/// a multi-line scalar. Blocks let a compound region be treated as a single
/// indexable range while exposing its internals as children.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticBlock {
    pub local_key: Option<String>,
    pub index_key: Option<String>,
    pub range: BlockRange,
    pub children: Vec<Semantics>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Semantics {
    Node(SemanticNode),
    Block(SemanticBlock),
}

/// Semantic-tree root for one top-level YAML document.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticAnchor {
    /// `"{Kind}:{name}"`, `"{Kind}:{ordinal}"` when unnamed, or
    /// `"Unknown:{ordinal}"` when the kind is missing.
    pub key: String,
    pub abs_position: Position,
    /// Delta from the previous anchor in the file.
    pub rel_position: Position,
    pub children: Vec<Semantics>,
}

/// The walker's threaded cursor: absolute start and length of the last
/// emitted token. Threading this through return values keeps the relative
/// encoding correct across arbitrarily nested structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCursor {
    pub abs: Position,
    pub length: u32,
}

impl TokenCursor {
    pub fn start_of(position: Position) -> Self {
        Self {
            abs: position,
            length: 0,
        }
    }

    /// Absolute position one past the end of the token.
    pub fn end(self) -> Position {
        Position::new(self.abs.line, self.abs.offset + self.length)
    }
}
