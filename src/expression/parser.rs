//! Expression token grouping
//!
//! Consumes lexer token runs line by line and builds nested semantic
//! nodes. Brackets open a new nesting level; quote-delimited strings come
//! out of the lexer as three tokens and are emitted as a three-node group.
//! Identifier classification happens here: an identifier immediately
//! followed by `(` becomes a function, one following `.` becomes a
//! property, and everything else stays a variable. Keyword builtins win
//! over the function rule.

use crate::position::Position;
use crate::semantic::{BlockRange, SemanticBlock, SemanticNode, Semantics, TokenCursor};
use crate::tokens::TokenType;

use super::lexer::{tokenize, Token, TokenKind};
use super::ExprError;

/// One physical line of expression text with its absolute source location.
/// The first line's `column` already accounts for the leading `=` and any
/// surrounding quote characters, which occupy column space but are not part
/// of the token stream.
#[derive(Debug, Clone, Copy)]
pub struct ExprLine<'a> {
    pub text: &'a str,
    pub line: u32,
    pub column: u32,
}

struct Frame {
    children: Vec<Semantics>,
    start_rel: Option<Position>,
}

struct OpenBracket {
    bracket: char,
    line: u32,
    offset: u32,
}

fn closes(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}

/// Parse a (possibly multi-line) expression into semantic nodes.
///
/// `anchor_abs` is the owning document anchor; `last_token` is the cursor
/// left by the previous sibling token, so the first emitted node's delta
/// chains correctly onto the surrounding YAML tokens. Returns the produced
/// nodes and the cursor after the final token.
pub fn parse_expression(
    lines: &[ExprLine<'_>],
    anchor_abs: Position,
    last_token: TokenCursor,
) -> Result<(Vec<Semantics>, TokenCursor), ExprError> {
    let mut stack = vec![Frame {
        children: Vec::new(),
        start_rel: None,
    }];
    let mut brackets: Vec<OpenBracket> = Vec::new();
    let mut cursor = last_token;
    let mut previous_text: Option<String> = None;

    for source_line in lines {
        let tokens =
            tokenize(source_line.text).map_err(|e| e.rebased(source_line.line, source_line.column))?;

        for (idx, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::Space {
                continue;
            }
            let abs = Position::new(source_line.line, source_line.column + token.start);
            let node_type = classify(token, &tokens[idx + 1..], previous_text.as_deref());

            match token.kind {
                TokenKind::Operator if is_open_bracket(token.text) => {
                    stack.push(Frame {
                        children: Vec::new(),
                        start_rel: Some(abs.relative_to(anchor_abs)),
                    });
                    brackets.push(OpenBracket {
                        bracket: bracket_char(token.text),
                        line: abs.line,
                        offset: abs.offset,
                    });
                    emit(&mut stack, node_type, token, abs, anchor_abs, &mut cursor);
                }
                TokenKind::Operator if is_close_bracket(token.text) => {
                    let close = bracket_char(token.text);
                    let open = brackets.pop().ok_or(ExprError::UnmatchedBracket {
                        bracket: close,
                        line: abs.line,
                        offset: abs.offset,
                    })?;
                    if !closes(open.bracket, close) {
                        return Err(ExprError::UnmatchedBracket {
                            bracket: close,
                            line: abs.line,
                            offset: abs.offset,
                        });
                    }
                    emit(&mut stack, node_type, token, abs, anchor_abs, &mut cursor);
                    let frame = stack.pop().expect("bracket frame present");
                    let start = frame.start_rel.expect("bracket frame has a start");
                    let block = SemanticBlock {
                        local_key: None,
                        index_key: None,
                        range: BlockRange {
                            start,
                            end: cursor.end().relative_to(anchor_abs),
                        },
                        children: frame.children,
                    };
                    stack
                        .last_mut()
                        .expect("root frame always present")
                        .children
                        .push(Semantics::Block(block));
                }
                _ => emit(&mut stack, node_type, token, abs, anchor_abs, &mut cursor),
            }

            previous_text = Some(token.text.to_string());
        }
    }

    if let Some(open) = brackets.pop() {
        return Err(ExprError::UnmatchedBracket {
            bracket: open.bracket,
            line: open.line,
            offset: open.offset,
        });
    }

    let root = stack.pop().expect("root frame survives balanced input");
    Ok((root.children, cursor))
}

fn is_open_bracket(text: &str) -> bool {
    matches!(text, "(" | "[" | "{")
}

fn is_close_bracket(text: &str) -> bool {
    matches!(text, ")" | "]" | "}")
}

fn bracket_char(text: &str) -> char {
    text.chars().next().unwrap_or_default()
}

fn classify(token: &Token<'_>, rest: &[Token<'_>], previous: Option<&str>) -> TokenType {
    match token.kind {
        TokenKind::Number => TokenType::Number,
        TokenKind::Quote => TokenType::Operator,
        TokenKind::StringBody => TokenType::String,
        TokenKind::Keyword => TokenType::Keyword,
        TokenKind::Operator => TokenType::Operator,
        TokenKind::Space => TokenType::Operator,
        TokenKind::Ident => {
            let next = rest.iter().find(|t| t.kind != TokenKind::Space);
            if matches!(next, Some(t) if t.text == "(") {
                TokenType::Function
            } else if previous == Some(".") {
                TokenType::Property
            } else {
                TokenType::Variable
            }
        }
    }
}

fn emit(
    stack: &mut [Frame],
    node_type: TokenType,
    token: &Token<'_>,
    abs: Position,
    anchor_abs: Position,
    cursor: &mut TokenCursor,
) {
    let length = token.end - token.start;
    let node = SemanticNode::leaf(
        node_type,
        abs.relative_to(cursor.abs),
        abs.relative_to(anchor_abs),
        length,
    );
    stack
        .last_mut()
        .expect("at least the root frame")
        .children
        .push(Semantics::Node(node));
    *cursor = TokenCursor { abs, length };
}
