//! Koreo resource-kind catalog
//!
//! Per-kind semantic structures for the supported Koreo resource kinds.
//! Index keys follow the `{Kind}:{name}` wire format: collaborators that
//! resolve references construct keys in exactly this shape to hit the
//! index. Function-flavored kinds (Function, ValueFunction,
//! ResourceFunction) all define and are referenced under `Function:{name}`,
//! matching how workflow `functionRef`/`ref` entries point at them.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::tokens::{TokenModifier, TokenType};

use super::structure::{FieldSpec, Structure};

/// API group all Koreo resources live under.
pub const API_GROUP: &str = "koreo.dev";

fn workflow_key(name: &str) -> String {
    format!("Workflow:{name}")
}

fn function_key(name: &str) -> String {
    format!("Function:{name}")
}

fn resource_template_key(name: &str) -> String {
    format!("ResourceTemplate:{name}")
}

fn function_test_key(name: &str) -> String {
    format!("FunctionTest:{name}")
}

fn step_index_key(label: &str) -> String {
    format!("Step:{label}")
}

fn step_local_key(label: &str) -> String {
    format!("label:{label}")
}

fn metadata_structure(name_key: super::structure::KeyFn) -> Structure {
    Structure::new()
        .field(
            "name",
            FieldSpec::new()
                .typed(TokenType::Class)
                .modifier(TokenModifier::Definition)
                .index_key(name_key)
                .sub(Structure::new().value(
                    FieldSpec::new()
                        .typed(TokenType::Class)
                        .modifier(TokenModifier::Definition),
                )),
        )
        .field(
            "namespace",
            FieldSpec::new()
                .typed(TokenType::Namespace)
                .sub(Structure::new().value(FieldSpec::new().typed(TokenType::Namespace))),
        )
}

fn resource_structure(name_key: super::structure::KeyFn, spec: Structure) -> Structure {
    Structure::new()
        .field("apiVersion", FieldSpec::new().typed(TokenType::Namespace))
        .field(
            "kind",
            FieldSpec::new()
                .typed(TokenType::Keyword)
                .sub(Structure::new().value(FieldSpec::new().typed(TokenType::Class))),
        )
        .field("metadata", FieldSpec::new().sub(metadata_structure(name_key)))
        .field("spec", FieldSpec::new().sub(spec))
}

fn function_ref_structure() -> Structure {
    Structure::new()
        .field("kind", FieldSpec::new().typed(TokenType::Class))
        .field(
            "name",
            FieldSpec::new()
                .typed(TokenType::Function)
                .index_key(function_key)
                .sub(Structure::new().value(FieldSpec::new().typed(TokenType::Function))),
        )
}

fn step_structure() -> Structure {
    Structure::new()
        .field(
            "label",
            FieldSpec::new()
                .typed(TokenType::Function)
                .modifier(TokenModifier::Definition)
                .local_key(step_local_key)
                .index_key(step_index_key)
                .sub(Structure::new().value(
                    FieldSpec::new()
                        .typed(TokenType::Function)
                        .modifier(TokenModifier::Definition),
                )),
        )
        .field("ref", FieldSpec::new().sub(function_ref_structure()))
        .field("functionRef", FieldSpec::new().sub(function_ref_structure()))
        .field(
            "inputs",
            FieldSpec::new().sub(
                Structure::new().any(FieldSpec::new().typed(TokenType::Argument)),
            ),
        )
        .field("condition", FieldSpec::new().typed(TokenType::Keyword))
        .field(
            "forEach",
            FieldSpec::new().sub(
                Structure::new()
                    .field("itemIn", FieldSpec::new().typed(TokenType::Keyword))
                    .field("inputKey", FieldSpec::new().typed(TokenType::Parameter)),
            ),
        )
}

fn workflow_structure() -> Structure {
    resource_structure(
        workflow_key,
        Structure::new()
            .field("entrypoint", FieldSpec::new().typed(TokenType::Keyword))
            .field(
                "crdRef",
                FieldSpec::new().sub(
                    Structure::new()
                        .field("apiGroup", FieldSpec::new().typed(TokenType::Namespace))
                        .field("version", FieldSpec::new().typed(TokenType::EnumMember))
                        .field("kind", FieldSpec::new().typed(TokenType::Class)),
                ),
            )
            .field(
                "steps",
                FieldSpec::new().sub(step_structure()),
            ),
    )
}

fn function_structure() -> Structure {
    resource_structure(
        function_key,
        Structure::new()
            .field(
                "locals",
                FieldSpec::new().sub(Structure::new().any(
                    FieldSpec::new()
                        .typed(TokenType::Variable)
                        .modifier(TokenModifier::Declaration),
                )),
            )
            .field(
                "preconditions",
                FieldSpec::new().sub(
                    Structure::new()
                        .field("assert", FieldSpec::new().typed(TokenType::Keyword))
                        .field("permFail", FieldSpec::new().sub(message_structure()))
                        .field("retry", FieldSpec::new().sub(message_structure())),
                ),
            )
            .field(
                "return",
                FieldSpec::new().sub(
                    Structure::new().any(FieldSpec::new().typed(TokenType::Property)),
                ),
            )
            .field(
                "apiConfig",
                FieldSpec::new().sub(
                    Structure::new()
                        .field("apiVersion", FieldSpec::new().typed(TokenType::Namespace))
                        .field("kind", FieldSpec::new().typed(TokenType::Class))
                        .field("name", FieldSpec::new().typed(TokenType::Variable)),
                ),
            )
            .field(
                "resource",
                FieldSpec::new().sub(
                    Structure::new().any(FieldSpec::new().typed(TokenType::Property)),
                ),
            ),
    )
}

fn message_structure() -> Structure {
    Structure::new()
        .field("message", FieldSpec::new().typed(TokenType::String))
        .field("delaySeconds", FieldSpec::new().typed(TokenType::Number))
}

fn resource_template_structure() -> Structure {
    resource_structure(
        resource_template_key,
        Structure::new().field(
            "template",
            FieldSpec::new().sub(
                Structure::new().any(FieldSpec::new().typed(TokenType::Property)),
            ),
        ),
    )
}

fn function_test_structure() -> Structure {
    resource_structure(
        function_test_key,
        Structure::new()
            .field("functionRef", FieldSpec::new().sub(function_ref_structure()))
            .field(
                "currentResource",
                FieldSpec::new().sub(
                    Structure::new().any(FieldSpec::new().typed(TokenType::Property)),
                ),
            )
            .field(
                "testCases",
                FieldSpec::new().sub(
                    Structure::new()
                        .field("label", FieldSpec::new().typed(TokenType::Function))
                        .field("expectReturn", FieldSpec::new())
                        .field("expectResource", FieldSpec::new())
                        .any(FieldSpec::new().typed(TokenType::Argument)),
                ),
            ),
    )
}

lazy_static! {
    static ref RESOURCE_SCHEMAS: HashMap<&'static str, Structure> = {
        let mut schemas = HashMap::new();
        schemas.insert("Workflow", workflow_structure());
        schemas.insert("Function", function_structure());
        schemas.insert("ValueFunction", function_structure());
        schemas.insert("ResourceFunction", function_structure());
        schemas.insert("ResourceTemplate", resource_template_structure());
        schemas.insert("FunctionTest", function_test_structure());
        schemas
    };
}

/// Schema for a resource kind, if it is in the catalog.
pub fn schema_for(kind: &str) -> Option<&'static Structure> {
    RESOURCE_SCHEMAS.get(kind)
}

/// All supported kinds, for diagnostics and completion.
pub fn supported_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = RESOURCE_SCHEMAS.keys().copied().collect();
    kinds.sort_unstable();
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_koreo_kinds() {
        for kind in [
            "Workflow",
            "Function",
            "ValueFunction",
            "ResourceFunction",
            "ResourceTemplate",
            "FunctionTest",
        ] {
            assert!(schema_for(kind).is_some(), "missing schema for {kind}");
        }
        assert!(schema_for("Deployment").is_none());
    }

    #[test]
    fn test_step_label_key_synthesis() {
        let workflow = schema_for("Workflow").unwrap();
        let steps = workflow
            .lookup("spec")
            .unwrap()
            .sub
            .lookup("steps")
            .unwrap();
        let label = steps.sub.lookup("label").unwrap();
        assert_eq!(label.local_key.unwrap()("deploy"), "label:deploy");
        assert_eq!(label.index_key.unwrap()("deploy"), "Step:deploy");
    }

    #[test]
    fn test_function_ref_key_synthesis() {
        let workflow = schema_for("Workflow").unwrap();
        let name = workflow
            .lookup("spec")
            .unwrap()
            .sub
            .lookup("steps")
            .unwrap()
            .sub
            .lookup("functionRef")
            .unwrap()
            .sub
            .lookup("name")
            .unwrap();
        assert_eq!(name.index_key.unwrap()("build-bucket"), "Function:build-bucket");
    }

    #[test]
    fn test_wildcard_inputs() {
        let workflow = schema_for("Workflow").unwrap();
        let inputs = workflow
            .lookup("spec")
            .unwrap()
            .sub
            .lookup("steps")
            .unwrap()
            .sub
            .lookup("inputs")
            .unwrap();
        let spec = inputs.sub.lookup("arbitraryInputName").unwrap();
        assert_eq!(spec.token_type, Some(TokenType::Argument));
    }
}
