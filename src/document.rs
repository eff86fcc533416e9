//! Document state management

use tower_lsp::lsp_types::{Diagnostic, SemanticToken};

use crate::semantic::encode::encode_tokens;
use crate::semantic::extract::{extract, ExtractResult};
use crate::semantic::index::collect_diagnostics;

/// The state of one open text document: its text, version and the semantic
/// index extracted from it. Indexing happens eagerly on every update; reads
/// never re-parse.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub version: i32,
    pub index: ExtractResult,
}

impl Document {
    /// Index the given text and wrap it as a document
    pub fn new(text: String, version: i32) -> Self {
        let index = extract(&text);
        Self {
            text,
            version,
            index,
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        collect_diagnostics(&self.index)
    }

    pub fn semantic_tokens(&self) -> Vec<SemanticToken> {
        encode_tokens(&self.index.anchors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_indexes_on_construction() {
        let document = Document::new("kind: Workflow\nmetadata:\n  name: demo\n".to_string(), 1);
        assert_eq!(document.version, 1);
        assert_eq!(document.index.anchors.len(), 1);
        assert!(!document.semantic_tokens().is_empty());
        assert!(document.diagnostics().is_empty());
    }
}
