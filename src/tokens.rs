//! Closed token-type vocabulary and modifier flags
//!
//! The type list and its ordering are shared with the editor through the
//! semantic-tokens legend, so the legend index of each variant is part of
//! the wire contract and must not be reordered.

use tower_lsp::lsp_types::{SemanticTokenModifier, SemanticTokenType, SemanticTokensLegend};

/// Semantic token types emitted by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    String,
    Number,
    Operator,
    Variable,
    Function,
    Property,
    Class,
    Namespace,
    Parameter,
    EnumMember,
    Event,
    TypeParameter,
    Argument,
}

/// Legend ordering. `TokenType::legend_index` assumes this layout.
pub const TOKEN_TYPES: [TokenType; 14] = [
    TokenType::Keyword,
    TokenType::String,
    TokenType::Number,
    TokenType::Operator,
    TokenType::Variable,
    TokenType::Function,
    TokenType::Property,
    TokenType::Class,
    TokenType::Namespace,
    TokenType::Parameter,
    TokenType::EnumMember,
    TokenType::Event,
    TokenType::TypeParameter,
    TokenType::Argument,
];

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Keyword => "keyword",
            TokenType::String => "string",
            TokenType::Number => "number",
            TokenType::Operator => "operator",
            TokenType::Variable => "variable",
            TokenType::Function => "function",
            TokenType::Property => "property",
            TokenType::Class => "class",
            TokenType::Namespace => "namespace",
            TokenType::Parameter => "parameter",
            TokenType::EnumMember => "enumMember",
            TokenType::Event => "event",
            TokenType::TypeParameter => "typeParameter",
            TokenType::Argument => "argument",
        }
    }

    pub fn legend_index(self) -> u32 {
        TOKEN_TYPES
            .iter()
            .position(|t| *t == self)
            .expect("token type present in legend") as u32
    }
}

/// Modifier flags, each a distinct bit in the encoded modifier bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenModifier {
    Declaration,
    Definition,
    Readonly,
    Static,
    Deprecated,
    Abstract,
    Async,
    Modification,
    Documentation,
    DefaultLibrary,
}

pub const TOKEN_MODIFIERS: [TokenModifier; 10] = [
    TokenModifier::Declaration,
    TokenModifier::Definition,
    TokenModifier::Readonly,
    TokenModifier::Static,
    TokenModifier::Deprecated,
    TokenModifier::Abstract,
    TokenModifier::Async,
    TokenModifier::Modification,
    TokenModifier::Documentation,
    TokenModifier::DefaultLibrary,
];

impl TokenModifier {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenModifier::Declaration => "declaration",
            TokenModifier::Definition => "definition",
            TokenModifier::Readonly => "readonly",
            TokenModifier::Static => "static",
            TokenModifier::Deprecated => "deprecated",
            TokenModifier::Abstract => "abstract",
            TokenModifier::Async => "async",
            TokenModifier::Modification => "modification",
            TokenModifier::Documentation => "documentation",
            TokenModifier::DefaultLibrary => "defaultLibrary",
        }
    }

    pub fn bit(self) -> u32 {
        let index = TOKEN_MODIFIERS
            .iter()
            .position(|m| *m == self)
            .expect("modifier present in legend");
        1 << index
    }
}

/// Combine modifiers into the wire bitmask.
pub fn modifier_bitmask(modifiers: &[TokenModifier]) -> u32 {
    modifiers.iter().fold(0, |mask, m| mask | m.bit())
}

/// The legend advertised to the client at initialization.
pub fn semantic_tokens_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: TOKEN_TYPES
            .iter()
            .map(|t| SemanticTokenType::new(t.as_str()))
            .collect(),
        token_modifiers: TOKEN_MODIFIERS
            .iter()
            .map(|m| SemanticTokenModifier::new(m.as_str()))
            .collect(),
    }
}
