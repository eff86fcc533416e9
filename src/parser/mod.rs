//! YAML loading with source-position tracking

mod loader;

pub use loader::{
    load_documents, to_plain, LoadError, LoadResult, MappingNode, PlainKind, ScalarNode,
    ScalarStyle, SequenceNode, YamlNode,
};
