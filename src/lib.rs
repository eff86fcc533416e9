//! koreo-ls: semantic indexer and LSP server for Koreo YAML resources
//!
//! This library provides the core functionality for the koreo-ls server:
//! - A position-recording YAML loader for multi-document resource files
//! - A semantic walker that classifies keys and values against per-kind
//!   schemas and parses `=`-prefixed expression scalars
//! - Key/range indexes powering definitions, references and diagnostics
//! - A delta-encoded semantic token stream for editor highlighting
//!
//! # Example
//!
//! ```
//! use koreo_ls::semantic::encode::encode_tokens;
//! use koreo_ls::semantic::extract::extract;
//!
//! let text = "kind: Workflow\nmetadata:\n  name: demo\n";
//! let indexed = extract(text);
//! assert_eq!(indexed.anchors[0].key, "Workflow:demo");
//! assert!(!encode_tokens(&indexed.anchors).is_empty());
//! ```

pub mod diagnostics;
pub mod document;
pub mod expression;
pub mod parser;
pub mod position;
pub mod schema;
pub mod semantic;
pub mod tokens;

mod backend;

pub use backend::Backend;
