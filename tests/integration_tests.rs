//! Integration tests for the koreo-ls indexing pipeline
//!
//! These tests exercise the whole path from document text to index entries,
//! diagnostics and semantic tokens, the same way the backend drives it.

use koreo_ls::document::Document;
use koreo_ls::parser::{load_documents, to_plain};
use koreo_ls::position::Position;
use koreo_ls::semantic::extract::extract;
use koreo_ls::semantic::index::{key_range_entries, IndexStore};
use tower_lsp::lsp_types::{DiagnosticSeverity, Url};

const WORKFLOW: &str = "\
apiVersion: koreo.dev/v1beta1
kind: Workflow
metadata:
  name: deployer
spec:
  steps:
    - label: build
      functionRef:
        name: build-bucket
      inputs:
        region: =inputs.region
    - label: deploy
      functionRef:
        name: deploy-bucket
";

const FUNCTION: &str = "\
apiVersion: koreo.dev/v1beta1
kind: Function
metadata:
  name: build-bucket
spec:
  locals:
    suffix: =inputs.region + '-bucket'
";

fn url(name: &str) -> Url {
    Url::parse(&format!("file:///workspace/{name}.yaml")).expect("valid test url")
}

/// Reconstruct absolute `(line, column, length)` triples from a document's
/// delta-encoded token stream.
fn absolute_tokens(document: &Document) -> Vec<(u32, u32, u32)> {
    let mut line = 0u32;
    let mut column = 0u32;
    let mut out = Vec::new();
    for token in document.semantic_tokens() {
        if token.delta_line == 0 {
            column += token.delta_start;
        } else {
            line += token.delta_line;
            column = token.delta_start;
        }
        out.push((line, column, token.length));
    }
    out
}

#[test]
fn test_valid_workflow_has_no_diagnostics() {
    let document = Document::new(WORKFLOW.to_string(), 1);
    let diagnostics = document.diagnostics();
    assert!(
        diagnostics.is_empty(),
        "Expected no diagnostics for valid workflow, got: {:?}",
        diagnostics
    );
}

#[test]
fn test_cross_file_reference_resolution() {
    let store = IndexStore::new();
    let workflow_uri = url("workflow");
    let function_uri = url("function");
    store.update(&workflow_uri, &extract(WORKFLOW).anchors);
    store.update(&function_uri, &extract(FUNCTION).anchors);

    // The workflow's functionRef points at the function's definition entry.
    let definitions = store.definitions("Function:build-bucket");
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].0, function_uri);
    assert_eq!(definitions[0].1.start, Position::new(3, 2));

    // Both the reference and the definition show up as occurrences.
    let occurrences = store.occurrences("Function:build-bucket");
    assert_eq!(occurrences.len(), 2);

    // Cursor on the reference resolves to the same key.
    assert_eq!(
        store.key_at(&workflow_uri, Position::new(8, 10)),
        Some("Function:build-bucket".to_string())
    );
}

#[test]
fn test_duplicate_step_labels_are_flagged_but_indexed() {
    let text = "\
kind: Workflow
metadata:
  name: dupes
spec:
  steps:
    - label: deploy
      functionRef:
        name: one
    - label: deploy
      functionRef:
        name: two
";
    let document = Document::new(text.to_string(), 1);

    let diagnostics = document.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    assert!(diagnostics[0].message.contains("label:deploy"));
    // The diagnostic lands on the second label's key token.
    assert_eq!(diagnostics[0].range.start.line, 8);

    // Both steps keep their index entries.
    let entries = key_range_entries(&document.index.anchors[0]);
    let deploy: Vec<_> = entries.iter().filter(|e| e.key == "Step:deploy").collect();
    assert_eq!(deploy.len(), 2);
    assert_eq!(deploy[0].start.line, 5);
    assert_eq!(deploy[1].start.line, 8);
}

#[test]
fn test_expression_tokens_land_on_scanner_positions() {
    let text = "\
kind: Function
metadata:
  name: namer
spec:
  locals:
    greeting: =inputs.name
";
    let document = Document::new(text.to_string(), 1);
    let tokens = absolute_tokens(&document);

    // `inputs` begins right after `greeting: =`, `name` after the dot.
    assert!(tokens.contains(&(5, 15, 6)), "missing inputs token: {tokens:?}");
    assert!(tokens.contains(&(5, 22, 4)), "missing name token: {tokens:?}");
}

#[test]
fn test_unterminated_string_aborts_only_the_expression() {
    let text = "\
kind: Workflow
metadata:
  name: partial
spec:
  steps:
    - label: broken
      inputs:
        bad: \"=inputs.a + 'oops\"
    - label: fine
      functionRef:
        name: cleanup
";
    let document = Document::new(text.to_string(), 1);

    // The document still anchors and the later step is fully indexed.
    assert_eq!(document.index.anchors.len(), 1);
    assert_eq!(document.index.anchors[0].key, "Workflow:partial");
    let entries = key_range_entries(&document.index.anchors[0]);
    assert!(entries.iter().any(|e| e.key == "Step:fine"));
    assert!(entries.iter().any(|e| e.key == "Function:cleanup"));

    let diagnostics = document.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("Unterminated string"));
    assert_eq!(diagnostics[0].range.start.line, 7);
}

#[test]
fn test_scan_error_keeps_completed_documents() {
    let text = "kind: Workflow\nmetadata:\n  name: ok\n---\nspec: [unclosed\n";
    let document = Document::new(text.to_string(), 1);

    assert_eq!(document.index.anchors.len(), 1);
    assert_eq!(document.index.anchors[0].key, "Workflow:ok");

    let diagnostics = document.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    assert!(diagnostics[0].range.start.line >= 3);
}

#[test]
fn test_strip_pass_matches_plain_parse() {
    let loaded = load_documents(WORKFLOW);
    assert!(loaded.error.is_none());
    let expected: serde_yaml::Value = serde_yaml::from_str(WORKFLOW).expect("valid yaml");
    assert_eq!(to_plain(&loaded.documents[0]), expected);
}

#[test]
fn test_reindex_replaces_stale_entries() {
    let store = IndexStore::new();
    let uri = url("workflow");
    store.update(&uri, &extract(WORKFLOW).anchors);
    assert!(!store.occurrences("Step:build").is_empty());

    let edited = WORKFLOW.replace("label: build", "label: stage");
    store.update(&uri, &extract(&edited).anchors);
    assert!(store.occurrences("Step:build").is_empty());
    assert!(!store.occurrences("Step:stage").is_empty());
    // Unrelated entries survive the replacement.
    assert!(!store.occurrences("Step:deploy").is_empty());
}

#[test]
fn test_multi_document_token_stream_is_continuous() {
    let text = format!("{WORKFLOW}---\n{FUNCTION}");
    let document = Document::new(text, 1);
    assert_eq!(document.index.anchors.len(), 2);

    let tokens = absolute_tokens(&document);
    // The second document's `kind` key sits on its own line; the chained
    // deltas must land there, not restart from zero.
    let workflow_lines = WORKFLOW.lines().count() as u32;
    assert!(tokens.contains(&(workflow_lines + 1 + 1, 0, 4)), "tokens: {tokens:?}");
}

#[test]
fn test_indexing_is_deterministic() {
    let first = Document::new(WORKFLOW.to_string(), 1);
    let second = Document::new(WORKFLOW.to_string(), 2);
    assert_eq!(first.index, second.index);
    assert_eq!(first.semantic_tokens(), second.semantic_tokens());
}
