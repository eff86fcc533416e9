//! Semantic-tree to LSP token stream adapter
//!
//! The tree already stores prev-token deltas in the asymmetric form the
//! semantic-tokens wire format uses, so encoding is a flatten: emit nodes
//! in tree order, map types and modifiers through the legend, done. Blocks
//! contribute no tokens of their own.

use tower_lsp::lsp_types::SemanticToken;

use crate::tokens::modifier_bitmask;

use super::{SemanticAnchor, Semantics};

/// Encode the anchors of one file into a delta-encoded token stream.
///
/// Anchors must be in document order: the walker threads its cursor across
/// documents, so the first token of each anchor is already relative to the
/// last token of the previous one.
pub fn encode_tokens(anchors: &[SemanticAnchor]) -> Vec<SemanticToken> {
    let mut out = Vec::new();
    for anchor in anchors {
        push_tokens(&anchor.children, &mut out);
    }
    out
}

fn push_tokens(children: &[Semantics], out: &mut Vec<SemanticToken>) {
    for child in children {
        match child {
            Semantics::Node(node) => {
                out.push(SemanticToken {
                    delta_line: node.position.line,
                    delta_start: node.position.offset,
                    length: node.length,
                    token_type: node.node_type.legend_index(),
                    token_modifiers_bitset: modifier_bitmask(&node.modifiers),
                });
                push_tokens(&node.children, out);
            }
            Semantics::Block(block) => push_tokens(&block.children, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::extract::extract;
    use crate::tokens::{TokenModifier, TokenType};

    #[test]
    fn test_simple_document_stream() {
        let tokens = encode_tokens(&extract("kind: Workflow\nmetadata:\n  name: demo\n").anchors);
        // kind, Workflow, metadata, name, demo.
        assert_eq!(tokens.len(), 5);

        assert_eq!(tokens[0].delta_line, 0);
        assert_eq!(tokens[0].delta_start, 0);
        assert_eq!(tokens[0].length, 4);
        assert_eq!(tokens[0].token_type, TokenType::Keyword.legend_index());

        // `Workflow` on the same line, 6 columns after `kind`.
        assert_eq!(tokens[1].delta_line, 0);
        assert_eq!(tokens[1].delta_start, 6);
        assert_eq!(tokens[1].token_type, TokenType::Class.legend_index());

        // `metadata` resets the column on a new line.
        assert_eq!(tokens[2].delta_line, 1);
        assert_eq!(tokens[2].delta_start, 0);
    }

    #[test]
    fn test_definition_modifier_in_bitset() {
        let tokens = encode_tokens(&extract("kind: Workflow\nmetadata:\n  name: demo\n").anchors);
        let name = &tokens[3];
        assert_eq!(name.token_type, TokenType::Class.legend_index());
        assert_eq!(
            name.token_modifiers_bitset,
            modifier_bitmask(&[TokenModifier::Definition])
        );
    }

    #[test]
    fn test_deltas_sum_to_scanner_positions() {
        let text = "\
kind: Function
metadata:
  name: calc
spec:
  locals:
    doubled: =inputs.value * 2
";
        let tokens = encode_tokens(&extract(text).anchors);
        let mut line = 0u32;
        let mut column = 0u32;
        let mut positions = Vec::new();
        for token in &tokens {
            if token.delta_line == 0 {
                column += token.delta_start;
            } else {
                line += token.delta_line;
                column = token.delta_start;
            }
            positions.push((line, column, token.length));
        }
        // The trailing literal `2` of the expression.
        assert_eq!(positions.last(), Some(&(5, 29, 1)));
        // `inputs` right after the `=` marker.
        assert!(positions.contains(&(5, 14, 6)));
    }

    #[test]
    fn test_multi_document_stream_chains_deltas() {
        let text = "kind: Workflow\nmetadata:\n  name: a\n---\nkind: Workflow\nmetadata:\n  name: b\n";
        let tokens = encode_tokens(&extract(text).anchors);
        // The first token of the second document is delta-encoded from the
        // last token of the first, never reset to zero.
        let second_kind = &tokens[5];
        assert_eq!(second_kind.delta_line, 2);
        assert_eq!(second_kind.delta_start, 0);
    }
}
