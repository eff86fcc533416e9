//! Index builders and the cross-file index store
//!
//! The builders flatten a semantic tree into lookup tables: `index_key` →
//! absolute range (cross-document definitions and references) and
//! `local_key` → absolute range (intra-document lookups such as step
//! labels). Absolute ranges are reconstructed from the anchor-relative
//! deltas; nothing here re-reads the source text.

use std::collections::HashMap;
use std::sync::RwLock;

use tower_lsp::lsp_types::{Diagnostic, Range, Url};

use crate::diagnostics::DiagnosticCollector;
use crate::position::Position;

use super::extract::ExtractResult;
use super::{SemanticAnchor, Semantics};

/// One resolved occurrence of an index or local key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
    pub key: String,
    pub start: Position,
    pub end: Position,
    /// True when the node declares the key (carries a declaration-flavored
    /// modifier) rather than referencing it.
    pub definition: bool,
}

impl KeyEntry {
    pub fn range(&self) -> Range {
        Range {
            start: self.start.to_lsp(),
            end: self.end.to_lsp(),
        }
    }
}

fn is_definition(node: &super::SemanticNode) -> bool {
    use crate::tokens::TokenModifier;
    node.modifiers
        .iter()
        .any(|m| matches!(m, TokenModifier::Definition | TokenModifier::Declaration))
}

fn collect_entries(
    children: &[Semantics],
    anchor_abs: Position,
    keys: &mut Vec<KeyEntry>,
    locals: &mut Vec<KeyEntry>,
) {
    for child in children {
        match child {
            Semantics::Node(node) => {
                let start = node.anchor_rel.resolve(anchor_abs);
                let end = Position::new(start.line, start.offset + node.length);
                if let Some(key) = &node.index_key {
                    keys.push(KeyEntry {
                        key: key.clone(),
                        start,
                        end,
                        definition: is_definition(node),
                    });
                }
                if let Some(key) = &node.local_key {
                    locals.push(KeyEntry {
                        key: key.clone(),
                        start,
                        end,
                        definition: is_definition(node),
                    });
                }
                collect_entries(&node.children, anchor_abs, keys, locals);
            }
            Semantics::Block(block) => {
                if let Some(key) = &block.index_key {
                    keys.push(KeyEntry {
                        key: key.clone(),
                        start: block.range.start.resolve(anchor_abs),
                        end: block.range.end.resolve(anchor_abs),
                        definition: false,
                    });
                }
                collect_entries(&block.children, anchor_abs, keys, locals);
            }
        }
    }
}

/// All `index_key` occurrences in one anchor, in document order. The
/// anchor's own key is included, covering the anchor's start position, so
/// `{Kind}:{name}` lookups land on the document header.
pub fn key_range_entries(anchor: &SemanticAnchor) -> Vec<KeyEntry> {
    let mut keys = vec![KeyEntry {
        key: anchor.key.clone(),
        start: anchor.abs_position,
        end: anchor.abs_position,
        definition: true,
    }];
    let mut locals = Vec::new();
    collect_entries(&anchor.children, anchor.abs_position, &mut keys, &mut locals);
    keys
}

/// All `local_key` occurrences in one anchor, in document order.
pub fn local_range_entries(anchor: &SemanticAnchor) -> Vec<KeyEntry> {
    let mut keys = Vec::new();
    let mut locals = Vec::new();
    collect_entries(&anchor.children, anchor.abs_position, &mut keys, &mut locals);
    locals
}

fn collect_node_diagnostics(
    children: &[Semantics],
    anchor_abs: Position,
    collector: &mut DiagnosticCollector,
) {
    for child in children {
        match child {
            Semantics::Node(node) => {
                if let Some(diagnostic) = &node.diagnostic {
                    let start = node.anchor_rel.resolve(anchor_abs);
                    let end = Position::new(start.line, start.offset + node.length);
                    collector.add(
                        Range {
                            start: start.to_lsp(),
                            end: end.to_lsp(),
                        },
                        diagnostic.severity,
                        diagnostic.message.clone(),
                    );
                }
                collect_node_diagnostics(&node.children, anchor_abs, collector);
            }
            Semantics::Block(block) => {
                collect_node_diagnostics(&block.children, anchor_abs, collector);
            }
        }
    }
}

/// Flatten every diagnostic in an extraction: stream-level scan errors and
/// document warnings first, then node-attached diagnostics per anchor in
/// document order.
pub fn collect_diagnostics(result: &ExtractResult) -> Vec<Diagnostic> {
    let mut collector = DiagnosticCollector::new();
    for stream in &result.diagnostics {
        let end = Position::new(stream.position.line, stream.position.offset + stream.length);
        collector.add(
            Range {
                start: stream.position.to_lsp(),
                end: end.to_lsp(),
            },
            stream.diagnostic.severity,
            stream.diagnostic.message.clone(),
        );
    }
    for anchor in &result.anchors {
        collect_node_diagnostics(&anchor.children, anchor.abs_position, &mut collector);
    }
    collector.into_diagnostics()
}

#[derive(Debug, Default, Clone, PartialEq)]
struct FileIndex {
    keys: Vec<KeyEntry>,
    locals: Vec<KeyEntry>,
}

/// Cross-file index shared by all open documents. Updates are scoped to a
/// single file: re-indexing replaces that file's entries under one write
/// lock so readers never observe a half-updated file.
#[derive(Debug, Default)]
pub struct IndexStore {
    files: RwLock<HashMap<Url, FileIndex>>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, uri: &Url, anchors: &[SemanticAnchor]) {
        let mut index = FileIndex::default();
        for anchor in anchors {
            index.keys.extend(key_range_entries(anchor));
            index.locals.extend(local_range_entries(anchor));
        }
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(uri.clone(), index);
    }

    pub fn remove(&self, uri: &Url) {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.remove(uri);
    }

    /// Every occurrence of `key` across all indexed files.
    pub fn occurrences(&self, key: &str) -> Vec<(Url, KeyEntry)> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let mut out = Vec::new();
        for (uri, index) in files.iter() {
            for entry in &index.keys {
                if entry.key == key {
                    out.push((uri.clone(), entry.clone()));
                }
            }
        }
        out
    }

    /// Definition sites of `key` across all indexed files.
    pub fn definitions(&self, key: &str) -> Vec<(Url, KeyEntry)> {
        self.occurrences(key)
            .into_iter()
            .filter(|(_, entry)| entry.definition)
            .collect()
    }

    /// The index or local key whose range contains `position` in `uri`.
    pub fn key_at(&self, uri: &Url, position: Position) -> Option<String> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let index = files.get(uri)?;
        index
            .keys
            .iter()
            .chain(index.locals.iter())
            .find(|entry| contains(entry, position))
            .map(|entry| entry.key.clone())
    }

    /// Local-key entries for one file, for intra-document lookups.
    pub fn locals(&self, uri: &Url) -> Vec<KeyEntry> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files
            .get(uri)
            .map(|index| index.locals.clone())
            .unwrap_or_default()
    }
}

fn contains(entry: &KeyEntry, position: Position) -> bool {
    entry.start.line == position.line
        && entry.start.offset <= position.offset
        && position.offset <= entry.end.offset
}
