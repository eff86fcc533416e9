//! Typed semantic-structure schema
//!
//! A [`Structure`] maps YAML field names to a [`FieldSpec`] describing how
//! the key and its value are classified. The schema is resolved once at
//! load time into this typed form; the walker never inspects untyped
//! nested mappings. Lookup always terminates: an unmatched key falls back
//! to the wildcard entry, and past that the walker applies a bare keyword
//! classification.

use std::collections::HashMap;

use crate::tokens::{TokenModifier, TokenType};

/// Synthesizes a lookup key from a scalar's raw text, e.g. turning
/// `label: deploy` into `label:deploy` or `Step:deploy`.
pub type KeyFn = fn(&str) -> String;

/// Classification for one field-path segment.
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub token_type: Option<TokenType>,
    pub modifiers: Vec<TokenModifier>,
    /// Intra-document key synthesized from the scalar value's text.
    pub local_key: Option<KeyFn>,
    /// Cross-document key synthesized from the scalar value's text.
    pub index_key: Option<KeyFn>,
    pub sub: Structure,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    pub fn modifier(mut self, modifier: TokenModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn local_key(mut self, f: KeyFn) -> Self {
        self.local_key = Some(f);
        self
    }

    pub fn index_key(mut self, f: KeyFn) -> Self {
        self.index_key = Some(f);
        self
    }

    pub fn sub(mut self, sub: Structure) -> Self {
        self.sub = sub;
        self
    }
}

/// Recursive field table for one nesting level. The wildcard entry covers
/// arbitrary child keys (e.g. step `inputs.*`); the value entry supplies
/// the classification of the scalar value sitting directly under the key.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    fields: HashMap<&'static str, FieldSpec>,
    any: Option<Box<FieldSpec>>,
    value: Option<Box<FieldSpec>>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, spec: FieldSpec) -> Self {
        self.fields.insert(name, spec);
        self
    }

    /// Wildcard entry for unmatched child keys.
    pub fn any(mut self, spec: FieldSpec) -> Self {
        self.any = Some(Box::new(spec));
        self
    }

    /// Value-sentinel entry for the scalar directly under this key.
    pub fn value(mut self, spec: FieldSpec) -> Self {
        self.value = Some(Box::new(spec));
        self
    }

    pub fn lookup(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key).or(self.any.as_deref())
    }

    pub fn value_spec(&self) -> Option<&FieldSpec> {
        self.value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_exact_field_over_wildcard() {
        let structure = Structure::new()
            .field("label", FieldSpec::new().typed(TokenType::Function))
            .any(FieldSpec::new().typed(TokenType::Argument));

        assert_eq!(
            structure.lookup("label").unwrap().token_type,
            Some(TokenType::Function)
        );
        assert_eq!(
            structure.lookup("anything").unwrap().token_type,
            Some(TokenType::Argument)
        );
    }

    #[test]
    fn test_lookup_without_wildcard_misses() {
        let structure = Structure::new().field("known", FieldSpec::new());
        assert!(structure.lookup("unknown").is_none());
    }

    #[test]
    fn test_value_sentinel() {
        let structure = Structure::new().value(FieldSpec::new().typed(TokenType::Class));
        assert_eq!(
            structure.value_spec().unwrap().token_type,
            Some(TokenType::Class)
        );
    }
}
