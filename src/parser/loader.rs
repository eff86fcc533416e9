//! Position-recording YAML loader
//!
//! Builds a node tree from the `yaml-rust2` marked event stream instead of
//! going through serde, so every scalar, mapping and sequence keeps the
//! source mark the scanner reported for it. Unlike a plain value parse this
//! tree preserves duplicate mapping keys and document ordering, both of
//! which the semantic walker depends on.

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::position::Position;

/// Scalar presentation style, as far as the indexer cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }

    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

/// How a plain scalar resolves under the core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

/// A scalar with its source mark.
#[derive(Debug, Clone)]
pub struct ScalarNode {
    pub value: String,
    pub style: ScalarStyle,
    pub mark: Position,
}

impl ScalarNode {
    /// Scalars whose text starts with `=` carry an embedded expression.
    pub fn is_expression(&self) -> bool {
        self.style != ScalarStyle::Folded && self.value.trim_start().starts_with('=')
    }

    /// Core-schema resolution for plain scalars. Quoted and block scalars
    /// are always strings.
    pub fn plain_kind(&self) -> PlainKind {
        if self.style != ScalarStyle::Plain {
            return PlainKind::Str;
        }
        match self.value.as_str() {
            "" | "~" | "null" | "Null" | "NULL" => PlainKind::Null,
            "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => PlainKind::Bool,
            text => {
                if text.parse::<i64>().is_ok() {
                    PlainKind::Int
                } else if text.parse::<f64>().is_ok()
                    && text.contains(['.', 'e', 'E'])
                    && !text.contains("inf")
                    && !text.contains("nan")
                {
                    PlainKind::Float
                } else {
                    PlainKind::Str
                }
            }
        }
    }
}

/// A mapping with entries in document order. Duplicate keys are kept.
#[derive(Debug, Clone)]
pub struct MappingNode {
    pub entries: Vec<(ScalarNode, YamlNode)>,
    pub mark: Position,
}

impl MappingNode {
    /// First entry matching `key`, ignoring later duplicates.
    pub fn get(&self, key: &str) -> Option<&YamlNode> {
        self.entries
            .iter()
            .find(|(k, _)| k.value == key)
            .map(|(_, v)| v)
    }

    pub fn get_scalar(&self, key: &str) -> Option<&ScalarNode> {
        match self.get(key) {
            Some(YamlNode::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    pub fn key_node(&self, key: &str) -> Option<&ScalarNode> {
        self.entries.iter().map(|(k, _)| k).find(|k| k.value == key)
    }
}

#[derive(Debug, Clone)]
pub struct SequenceNode {
    pub items: Vec<YamlNode>,
    pub mark: Position,
}

#[derive(Debug, Clone)]
pub enum YamlNode {
    Scalar(ScalarNode),
    Mapping(MappingNode),
    Sequence(SequenceNode),
}

impl YamlNode {
    pub fn mark(&self) -> Position {
        match self {
            YamlNode::Scalar(s) => s.mark,
            YamlNode::Mapping(m) => m.mark,
            YamlNode::Sequence(s) => s.mark,
        }
    }

    pub fn as_mapping(&self) -> Option<&MappingNode> {
        match self {
            YamlNode::Mapping(m) => Some(m),
            _ => None,
        }
    }
}

/// Scan failure with the scanner's best-known position. Documents completed
/// before the failure are still returned.
#[derive(Debug, Clone)]
pub struct LoadError {
    pub message: String,
    pub position: Position,
}

#[derive(Debug, Default)]
pub struct LoadResult {
    pub documents: Vec<YamlNode>,
    pub error: Option<LoadError>,
}

enum Container {
    Mapping {
        mark: Position,
        entries: Vec<(ScalarNode, YamlNode)>,
        pending_key: Option<ScalarNode>,
    },
    Sequence {
        mark: Position,
        items: Vec<YamlNode>,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Container>,
    current_root: Option<YamlNode>,
    documents: Vec<YamlNode>,
}

fn mark_position(marker: Marker) -> Position {
    // Scanner lines are 1-based, columns 0-based.
    Position::new(marker.line().saturating_sub(1) as u32, marker.col() as u32)
}

fn scalar_style(style: TScalarStyle) -> ScalarStyle {
    match style {
        TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        TScalarStyle::Literal => ScalarStyle::Literal,
        TScalarStyle::Folded => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

impl TreeBuilder {
    fn push_complete(&mut self, node: YamlNode) {
        match self.stack.last_mut() {
            None => self.current_root = Some(node),
            Some(Container::Sequence { items, .. }) => items.push(node),
            Some(Container::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push((key, node)),
                None => {
                    // Keys are expected to be scalars. A complex key is
                    // replaced by an empty scalar at its mark so walking
                    // can continue.
                    *pending_key = Some(match node {
                        YamlNode::Scalar(s) => s,
                        other => ScalarNode {
                            value: String::new(),
                            style: ScalarStyle::Plain,
                            mark: other.mark(),
                        },
                    });
                }
            },
        }
    }

    fn close_container(&mut self) {
        if let Some(container) = self.stack.pop() {
            let node = match container {
                Container::Mapping { mark, entries, .. } => {
                    YamlNode::Mapping(MappingNode { entries, mark })
                }
                Container::Sequence { mark, items } => {
                    YamlNode::Sequence(SequenceNode { items, mark })
                }
            };
            self.push_complete(node);
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        let mark = mark_position(marker);
        match event {
            Event::Scalar(value, style, _, _) => {
                self.push_complete(YamlNode::Scalar(ScalarNode {
                    value,
                    style: scalar_style(style),
                    mark,
                }));
            }
            Event::MappingStart(_, _) => {
                self.stack.push(Container::Mapping {
                    mark,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }
            Event::MappingEnd => self.close_container(),
            Event::SequenceStart(_, _) => {
                self.stack.push(Container::Sequence {
                    mark,
                    items: Vec::new(),
                });
            }
            Event::SequenceEnd => self.close_container(),
            Event::Alias(_) => {
                // Aliases are not resolved; stand in with a null scalar so
                // sibling positions stay intact.
                self.push_complete(YamlNode::Scalar(ScalarNode {
                    value: String::new(),
                    style: ScalarStyle::Plain,
                    mark,
                }));
            }
            Event::DocumentEnd => {
                if let Some(root) = self.current_root.take() {
                    self.documents.push(root);
                }
            }
            _ => {}
        }
    }
}

/// Parse a possibly multi-document YAML stream into position-tracked trees.
pub fn load_documents(text: &str) -> LoadResult {
    let mut builder = TreeBuilder::default();
    let mut parser = Parser::new_from_str(text);
    let error = match parser.load(&mut builder, true) {
        Ok(()) => None,
        Err(err) => Some(LoadError {
            message: err.to_string(),
            position: mark_position(*err.marker()),
        }),
    };
    // A scan failure mid-document leaves a partial root; it is discarded so
    // only fully constructed documents reach the walker.
    LoadResult {
        documents: builder.documents,
        error,
    }
}

/// Strip pass: drop all position metadata and hand back plain data for the
/// resource-preparation consumers.
pub fn to_plain(node: &YamlNode) -> serde_yaml::Value {
    match node {
        YamlNode::Scalar(scalar) => match scalar.plain_kind() {
            PlainKind::Null => serde_yaml::Value::Null,
            PlainKind::Bool => serde_yaml::Value::Bool(scalar.value == "true"
                || scalar.value == "True"
                || scalar.value == "TRUE"),
            PlainKind::Int => scalar
                .value
                .parse::<i64>()
                .map(|n| serde_yaml::Value::Number(n.into()))
                .unwrap_or(serde_yaml::Value::Null),
            PlainKind::Float => scalar
                .value
                .parse::<f64>()
                .map(|n| serde_yaml::Value::Number(n.into()))
                .unwrap_or(serde_yaml::Value::Null),
            PlainKind::Str => serde_yaml::Value::String(scalar.value.clone()),
        },
        YamlNode::Mapping(mapping) => {
            let mut out = serde_yaml::Mapping::new();
            for (key, value) in &mapping.entries {
                out.insert(
                    serde_yaml::Value::String(key.value.clone()),
                    to_plain(value),
                );
            }
            serde_yaml::Value::Mapping(out)
        }
        YamlNode::Sequence(sequence) => {
            serde_yaml::Value::Sequence(sequence.items.iter().map(to_plain).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> YamlNode {
        let result = load_documents(text);
        assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
        assert_eq!(result.documents.len(), 1);
        result.documents.into_iter().next().unwrap()
    }

    #[test]
    fn test_scalar_marks() {
        let doc = single("name: alpha\ncount: 3");
        let mapping = doc.as_mapping().unwrap();
        let key = mapping.key_node("name").unwrap();
        assert_eq!(key.mark, Position::new(0, 0));
        let value = mapping.get_scalar("name").unwrap();
        assert_eq!(value.mark, Position::new(0, 6));
        let count = mapping.get_scalar("count").unwrap();
        assert_eq!(count.mark, Position::new(1, 7));
        assert_eq!(count.plain_kind(), PlainKind::Int);
    }

    #[test]
    fn test_duplicate_keys_preserved() {
        let doc = single("label: one\nlabel: two");
        let mapping = doc.as_mapping().unwrap();
        assert_eq!(mapping.entries.len(), 2);
        assert_eq!(mapping.entries[0].0.value, "label");
        assert_eq!(mapping.entries[1].0.value, "label");
    }

    #[test]
    fn test_multi_document_stream() {
        let result = load_documents("a: 1\n---\nb: 2\n---\nc: 3");
        assert!(result.error.is_none());
        assert_eq!(result.documents.len(), 3);
    }

    #[test]
    fn test_scan_error_reports_position_and_keeps_earlier_documents() {
        let result = load_documents("ok: true\n---\nkey: [unclosed\n");
        let error = result.error.expect("expected scan error");
        assert!(error.position.line >= 2);
        assert_eq!(result.documents.len(), 1);
    }

    #[test]
    fn test_quoted_scalar_style() {
        let doc = single("a: 'single'\nb: \"double\"");
        let mapping = doc.as_mapping().unwrap();
        assert_eq!(
            mapping.get_scalar("a").unwrap().style,
            ScalarStyle::SingleQuoted
        );
        assert_eq!(
            mapping.get_scalar("b").unwrap().style,
            ScalarStyle::DoubleQuoted
        );
        assert_eq!(mapping.get_scalar("a").unwrap().plain_kind(), PlainKind::Str);
    }

    #[test]
    fn test_expression_detection() {
        let doc = single("value: =inputs.name\nplain: inputs.name");
        let mapping = doc.as_mapping().unwrap();
        assert!(mapping.get_scalar("value").unwrap().is_expression());
        assert!(!mapping.get_scalar("plain").unwrap().is_expression());
    }

    #[test]
    fn test_to_plain_matches_serde_parse() {
        let text = "kind: Workflow\nspec:\n  steps:\n    - label: one\n      enabled: true\n      count: 2\n";
        let doc = single(text);
        let expected: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        assert_eq!(to_plain(&doc), expected);
    }

    #[test]
    fn test_block_scalar_style() {
        let doc = single("script: |\n  =a + b\n  + c\n");
        let mapping = doc.as_mapping().unwrap();
        let scalar = mapping.get_scalar("script").unwrap();
        assert_eq!(scalar.style, ScalarStyle::Literal);
        assert!(scalar.is_expression());
        assert!(scalar.value.contains('\n'));
    }
}
