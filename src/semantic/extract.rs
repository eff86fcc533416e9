//! YAML semantic-structure walker
//!
//! Walks the position-tracked YAML tree for each top-level document,
//! consulting the per-kind schema to classify keys and values, and hands
//! scalar expressions (`=`-prefixed) to the expression parser. The walker
//! carries no state across documents; per-document state is the position
//! cursor (threaded through return values) and the duplicate-key sets.

use std::collections::HashSet;

use lazy_static::lazy_static;
use tower_lsp::lsp_types::DiagnosticSeverity;

use crate::expression::{parse_expression, ExprLine};
use crate::parser::{
    load_documents, MappingNode, PlainKind, ScalarNode, SequenceNode, YamlNode,
};
use crate::position::Position;
use crate::schema::{schema_for, supported_kinds, FieldSpec, Structure, API_GROUP};
use crate::tokens::TokenType;

use super::{
    BlockRange, NodeDiagnostic, SemanticAnchor, SemanticBlock, SemanticNode, Semantics,
    TokenCursor,
};

lazy_static! {
    // Used when a document's kind has no catalog entry: every key degrades
    // to the bare keyword classification instead of failing.
    static ref FALLBACK_STRUCTURE: Structure = Structure::new();
    // Block scalar header at the end of a line: `|`, `>`, with optional
    // chomping/indentation indicators (`|-`, `>2`, ...).
    static ref BLOCK_HEADER_RE: regex::Regex =
        regex::Regex::new(r"[|>][0-9]*[+-]?$").unwrap();
}

/// A diagnostic that is not attached to any tree node: stream-level scan
/// errors and document-level structural warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDiagnostic {
    pub position: Position,
    pub length: u32,
    pub diagnostic: NodeDiagnostic,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractResult {
    pub anchors: Vec<SemanticAnchor>,
    pub diagnostics: Vec<StreamDiagnostic>,
}

fn char_count(text: &str) -> u32 {
    text.chars().count() as u32
}

/// Tail of `line` starting at a character column.
fn slice_from(line: &str, column: u32) -> &str {
    match line.char_indices().nth(column as usize) {
        Some((byte, _)) => &line[byte..],
        None => "",
    }
}

/// Turn per-source-line content into expression lines. The first line's
/// leading `=` occupies column space but is not part of the token stream.
fn expression_lines<'b>(content: &[(u32, u32, &'b str)]) -> Vec<ExprLine<'b>> {
    content
        .iter()
        .enumerate()
        .map(|(index, (line, indent, text))| {
            let (body, column) = if index == 0 {
                let body = text.strip_prefix('=').unwrap_or(text);
                (body, indent + (char_count(text) - char_count(body)))
            } else {
                (*text, *indent)
            };
            ExprLine {
                text: body,
                line: *line,
                column,
            }
        })
        .collect()
}

/// Index a whole file: parse the (possibly multi-document) stream and build
/// one anchor per completed document. A pure function of the input text and
/// the static schema catalog; re-running it on unchanged text produces a
/// structurally identical result.
pub fn extract(text: &str) -> ExtractResult {
    let lines: Vec<&str> = text.lines().collect();
    let loaded = load_documents(text);

    let mut result = ExtractResult::default();
    if let Some(error) = loaded.error {
        result.diagnostics.push(StreamDiagnostic {
            position: error.position,
            length: 1,
            diagnostic: NodeDiagnostic {
                message: error.message,
                severity: DiagnosticSeverity::ERROR,
            },
        });
    }

    let mut previous_anchor = Position::new(0, 0);
    let mut cursor = TokenCursor::start_of(Position::new(0, 0));
    for (ordinal, document) in loaded.documents.iter().enumerate() {
        let (anchor, next_cursor) = extract_document(
            document,
            ordinal,
            &lines,
            previous_anchor,
            cursor,
            &mut result.diagnostics,
        );
        previous_anchor = anchor.abs_position;
        cursor = next_cursor;
        result.anchors.push(anchor);
    }
    result
}

fn extract_document(
    document: &YamlNode,
    ordinal: usize,
    lines: &[&str],
    previous_anchor: Position,
    cursor: TokenCursor,
    diagnostics: &mut Vec<StreamDiagnostic>,
) -> (SemanticAnchor, TokenCursor) {
    let anchor_abs = document.mark();
    let root = document.as_mapping();

    let kind = root.and_then(|m| m.get_scalar("kind"));
    let name = root
        .and_then(|m| m.get("metadata"))
        .and_then(|metadata| metadata.as_mapping())
        .and_then(|metadata| metadata.get_scalar("name"));

    // Key derivation keeps anchors unique within a file even for malformed
    // documents.
    let key = match (kind, name) {
        (Some(kind), Some(name)) => format!("{}:{}", kind.value, name.value),
        (Some(kind), None) => format!("{}:{}", kind.value, ordinal),
        (None, _) => format!("Unknown:{ordinal}"),
    };

    let structure = match kind {
        Some(kind_scalar) => match schema_for(&kind_scalar.value) {
            Some(structure) => structure,
            None => {
                diagnostics.push(StreamDiagnostic {
                    position: kind_scalar.mark,
                    length: char_count(&kind_scalar.value),
                    diagnostic: NodeDiagnostic {
                        message: format!(
                            "Unsupported resource kind '{}' (supported: {})",
                            kind_scalar.value,
                            supported_kinds().join(", ")
                        ),
                        severity: DiagnosticSeverity::INFORMATION,
                    },
                });
                &FALLBACK_STRUCTURE
            }
        },
        None => &FALLBACK_STRUCTURE,
    };

    if let Some(api_version) = root.and_then(|m| m.get_scalar("apiVersion")) {
        if !api_version.value.starts_with(API_GROUP) {
            diagnostics.push(StreamDiagnostic {
                position: api_version.mark,
                length: char_count(&api_version.value),
                diagnostic: NodeDiagnostic {
                    message: format!(
                        "apiVersion '{}' is not a {} API version",
                        api_version.value, API_GROUP
                    ),
                    severity: DiagnosticSeverity::INFORMATION,
                },
            });
        }
    }

    let mut walker = Walker {
        lines,
        anchor_abs,
        local_keys: HashSet::new(),
    };
    let (children, cursor) = walker.walk(document, structure, structure.value_spec(), cursor);

    (
        SemanticAnchor {
            key,
            abs_position: anchor_abs,
            rel_position: anchor_abs.relative_to(previous_anchor),
            children,
        },
        cursor,
    )
}

struct Walker<'a> {
    lines: &'a [&'a str],
    anchor_abs: Position,
    local_keys: HashSet<String>,
}

impl<'a> Walker<'a> {
    fn walk(
        &mut self,
        node: &YamlNode,
        structure: &Structure,
        value_spec: Option<&FieldSpec>,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        match node {
            YamlNode::Scalar(scalar) => self.walk_scalar(scalar, value_spec, cursor),
            YamlNode::Mapping(mapping) => self.walk_mapping(mapping, structure, cursor),
            YamlNode::Sequence(sequence) => self.walk_sequence(sequence, structure, cursor),
        }
    }

    fn walk_mapping(
        &mut self,
        mapping: &MappingNode,
        structure: &Structure,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        let start = mapping.mark.relative_to(self.anchor_abs);
        let mut seen_keys: HashSet<&str> = HashSet::new();
        let mut children = Vec::new();
        let mut cursor = cursor;

        for (key, value) in &mapping.entries {
            let spec = structure.lookup(&key.value);
            let key_abs = key.mark;
            let key_length = char_count(&key.value);

            let mut key_node = SemanticNode::leaf(
                spec.and_then(|s| s.token_type).unwrap_or(TokenType::Keyword),
                key_abs.relative_to(cursor.abs),
                key_abs.relative_to(self.anchor_abs),
                key_length,
            );
            if let Some(spec) = spec {
                key_node.modifiers = spec.modifiers.clone();
            }

            // Duplicate keys are flagged but never abort the walk; both
            // occurrences stay in the tree.
            if !seen_keys.insert(key.value.as_str()) {
                key_node.diagnostic = Some(NodeDiagnostic {
                    message: format!("Duplicate key: '{}'", key.value),
                    severity: DiagnosticSeverity::ERROR,
                });
            }

            if let YamlNode::Scalar(value_scalar) = value {
                let raw = value_scalar.value.trim();
                if let Some(make_key) = spec.and_then(|s| s.local_key) {
                    let local = make_key(raw);
                    if !self.local_keys.insert(local.clone()) && key_node.diagnostic.is_none() {
                        key_node.diagnostic = Some(NodeDiagnostic {
                            message: format!("Duplicate '{local}' definition"),
                            severity: DiagnosticSeverity::ERROR,
                        });
                    }
                    key_node.local_key = Some(local);
                }
                if let Some(make_key) = spec.and_then(|s| s.index_key) {
                    key_node.index_key = Some(make_key(raw));
                }
            }

            cursor = TokenCursor {
                abs: key_abs,
                length: key_length,
            };

            // The value's nodes hang off the key node, so a lookup landing
            // on the key can navigate into its value.
            let sub = spec.map(|s| &s.sub).unwrap_or(&FALLBACK_STRUCTURE);
            let (value_children, next_cursor) =
                self.walk(value, sub, sub.value_spec(), cursor);
            key_node.children = value_children;
            cursor = next_cursor;

            children.push(Semantics::Node(key_node));
        }

        let block = SemanticBlock {
            local_key: None,
            index_key: None,
            range: BlockRange {
                start,
                end: cursor.end().relative_to(self.anchor_abs),
            },
            children,
        };
        (vec![Semantics::Block(block)], cursor)
    }

    fn walk_sequence(
        &mut self,
        sequence: &SequenceNode,
        structure: &Structure,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        let start = sequence.mark.relative_to(self.anchor_abs);
        let mut children = Vec::new();
        let mut cursor = cursor;

        // Every element shares the same item schema; their children
        // accumulate as siblings.
        for item in &sequence.items {
            let (item_children, next_cursor) =
                self.walk(item, structure, structure.value_spec(), cursor);
            children.extend(item_children);
            cursor = next_cursor;
        }

        let block = SemanticBlock {
            local_key: None,
            index_key: None,
            range: BlockRange {
                start,
                end: cursor.end().relative_to(self.anchor_abs),
            },
            children,
        };
        (vec![Semantics::Block(block)], cursor)
    }

    fn walk_scalar(
        &mut self,
        scalar: &ScalarNode,
        value_spec: Option<&FieldSpec>,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        let inferred = match scalar.plain_kind() {
            PlainKind::Int | PlainKind::Float | PlainKind::Bool => TokenType::Number,
            _ => TokenType::String,
        };
        let node_type = value_spec.and_then(|s| s.token_type).unwrap_or(inferred);

        if node_type == TokenType::String && scalar.is_expression() {
            // The single dispatch point where the embedded DSL enters the
            // YAML tree.
            match self.walk_expression(scalar, cursor) {
                Ok(result) => return result,
                Err(error) => {
                    let abs = scalar.mark;
                    let length = self.scalar_first_line_length(scalar);
                    let mut node = SemanticNode::leaf(
                        TokenType::String,
                        abs.relative_to(cursor.abs),
                        abs.relative_to(self.anchor_abs),
                        length,
                    );
                    node.diagnostic = Some(NodeDiagnostic {
                        message: error.to_string(),
                        severity: DiagnosticSeverity::ERROR,
                    });
                    return (vec![Semantics::Node(node)], TokenCursor { abs, length });
                }
            }
        }

        if scalar.style.is_block() {
            return self.walk_block_scalar(scalar, node_type, value_spec, cursor);
        }
        if !scalar.style.is_quoted() {
            // A plain scalar may fold across several physical lines; each
            // line gets its own node so its position stays addressable.
            let content = self.plain_scalar_lines(scalar);
            if content.len() > 1 {
                return self.emit_line_nodes(&content, scalar.mark, node_type, value_spec, cursor);
            }
        }

        let abs = scalar.mark;
        let length = self.scalar_first_line_length(scalar);
        let mut node = SemanticNode::leaf(
            node_type,
            abs.relative_to(cursor.abs),
            abs.relative_to(self.anchor_abs),
            length,
        );
        if let Some(spec) = value_spec {
            node.modifiers = spec.modifiers.clone();
        }
        (vec![Semantics::Node(node)], TokenCursor { abs, length })
    }

    fn walk_block_scalar(
        &mut self,
        scalar: &ScalarNode,
        node_type: TokenType,
        value_spec: Option<&FieldSpec>,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        let content = self.block_scalar_lines(scalar);
        if content.is_empty() {
            let abs = scalar.mark;
            let node = SemanticNode::leaf(
                node_type,
                abs.relative_to(cursor.abs),
                abs.relative_to(self.anchor_abs),
                1,
            );
            return (vec![Semantics::Node(node)], TokenCursor { abs, length: 1 });
        }
        self.emit_line_nodes(&content, scalar.mark, node_type, value_spec, cursor)
    }

    /// One node per physical line so each line's position is independently
    /// addressable; a single line comes back unwrapped, more are grouped
    /// under a block.
    fn emit_line_nodes(
        &self,
        content: &[(u32, u32, &'a str)],
        start_mark: Position,
        node_type: TokenType,
        value_spec: Option<&FieldSpec>,
        cursor: TokenCursor,
    ) -> (Vec<Semantics>, TokenCursor) {
        let start_rel = start_mark.relative_to(self.anchor_abs);
        let mut children = Vec::new();
        let mut cursor = cursor;
        for (line, indent, text) in content {
            let abs = Position::new(*line, *indent);
            let length = char_count(text);
            let mut node = SemanticNode::leaf(
                node_type,
                abs.relative_to(cursor.abs),
                abs.relative_to(self.anchor_abs),
                length,
            );
            if let Some(spec) = value_spec {
                node.modifiers = spec.modifiers.clone();
            }
            cursor = TokenCursor { abs, length };
            children.push(Semantics::Node(node));
        }

        if children.len() == 1 {
            return (children, cursor);
        }
        let block = SemanticBlock {
            local_key: None,
            index_key: None,
            range: BlockRange {
                start: start_rel,
                end: cursor.end().relative_to(self.anchor_abs),
            },
            children,
        };
        (vec![Semantics::Block(block)], cursor)
    }

    fn walk_expression(
        &mut self,
        scalar: &ScalarNode,
        cursor: TokenCursor,
    ) -> Result<(Vec<Semantics>, TokenCursor), crate::expression::ExprError> {
        if scalar.style.is_block() {
            // Synthetic operator marking the multi-line boundary at the
            // block-scalar indicator.
            let abs = scalar.mark;
            let mut nodes = Vec::new();
            let boundary = SemanticNode::leaf(
                TokenType::Operator,
                abs.relative_to(cursor.abs),
                abs.relative_to(self.anchor_abs),
                1,
            );
            let mut cursor = TokenCursor { abs, length: 1 };
            nodes.push(Semantics::Node(boundary));

            let content = self.block_scalar_lines(scalar);
            let (children, next_cursor) =
                parse_expression(&expression_lines(&content), self.anchor_abs, cursor)?;
            nodes.extend(children);
            cursor = next_cursor;
            return Ok((nodes, cursor));
        }

        if !scalar.style.is_quoted() {
            // A folded plain expression continues on deeper-indented lines.
            let content = self.plain_scalar_lines(scalar);
            if content.len() > 1 {
                return parse_expression(&expression_lines(&content), self.anchor_abs, cursor);
            }
        }

        // Single source line. The body comes from the parsed value; for
        // double-quoted scalars YAML escape sequences are already collapsed
        // there, so tokens after an escape sit one column left per escape.
        // Lexing the raw source instead would hand the expression lexer
        // YAML-level backslashes and break valid string literals.
        let trimmed = scalar.value.trim_start();
        let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
        let body = body.lines().next().unwrap_or("");
        let quote = u32::from(scalar.style.is_quoted());
        let lead = char_count(&scalar.value) - char_count(trimmed);
        let column = scalar.mark.offset + quote + lead + 1;
        let lines = [ExprLine {
            text: body,
            line: scalar.mark.line,
            column,
        }];
        parse_expression(&lines, self.anchor_abs, cursor)
    }

    /// Physical source lines of a plain scalar. The parsed value is folded,
    /// so the source is re-segmented by matching each line's trimmed text
    /// against the remaining folded value; on a mismatch (e.g. a trailing
    /// comment) the scan stops and the caller keeps the single-node path.
    fn plain_scalar_lines(&self, scalar: &ScalarNode) -> Vec<(u32, u32, &'a str)> {
        let mark_line = scalar.mark.line as usize;
        let mut remaining = scalar.value.trim_end();
        let mut out = Vec::new();
        for (number, raw) in self.lines.iter().enumerate().skip(mark_line) {
            let (indent, text) = if number == mark_line {
                (
                    scalar.mark.offset,
                    slice_from(raw, scalar.mark.offset).trim_end(),
                )
            } else {
                if raw.trim().is_empty() {
                    continue;
                }
                (char_count(raw) - char_count(raw.trim_start()), raw.trim())
            };
            if text.is_empty() || !remaining.starts_with(text) {
                break;
            }
            out.push((number as u32, indent, text));
            remaining = remaining[text.len()..].trim_start();
            if remaining.is_empty() {
                break;
            }
        }
        out
    }

    /// Visible length of a scalar's first line, including quote delimiters
    /// and the block indicator.
    fn scalar_first_line_length(&self, scalar: &ScalarNode) -> u32 {
        if scalar.style.is_block() {
            return 1;
        }
        let first = scalar.value.lines().next().unwrap_or("");
        let quotes = if scalar.style.is_quoted() { 2 } else { 0 };
        char_count(first) + quotes
    }

    /// Content lines of a block scalar, straight from the source text:
    /// `(line, indent, trimmed text)` for each non-blank line until the
    /// indentation drops below the block's base.
    fn block_scalar_lines(&self, scalar: &ScalarNode) -> Vec<(u32, u32, &'a str)> {
        // The scanner's mark may sit on the `|`/`>` header line or on the
        // first content line; content always begins after a header.
        let mark_line = scalar.mark.line as usize;
        let on_header = self
            .lines
            .get(mark_line)
            .is_some_and(|line| BLOCK_HEADER_RE.is_match(line.trim_end()));
        let start = if on_header { mark_line + 1 } else { mark_line };
        let mut base: Option<u32> = None;
        let mut out = Vec::new();
        for (number, raw) in self.lines.iter().enumerate().skip(start) {
            if raw.trim().is_empty() {
                continue;
            }
            let indent = char_count(raw) - char_count(raw.trim_start());
            match base {
                None => base = Some(indent),
                Some(base_indent) if indent < base_indent => break,
                Some(_) => {}
            }
            out.push((number as u32, indent, raw.trim()));
        }
        out
    }
}
