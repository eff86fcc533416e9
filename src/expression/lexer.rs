//! Expression tokenizer
//!
//! Tokenizes one physical line of an embedded expression into a flat,
//! ordered token run. Whitespace runs are emitted as explicit tokens rather
//! than skipped: downstream position math relies on the run covering the
//! input contiguously, with no gaps and no overlaps.

use lazy_static::lazy_static;
use regex::Regex;

use super::ExprError;

/// Built-in functions and literals of the expression grammar. These stay
/// `keyword` even when followed by `(`, taking precedence over the
/// function-call reclassification in the parser.
pub const KEYWORD_FUNCTIONS: &[&str] = &[
    // Literals
    "true", "false", "null", // Macros and membership
    "has", "all", "exists", "exists_one", "map", "filter", "in", // Builtins
    "size", "matches", "startsWith", "endsWith", "contains", // Conversions
    "string", "int", "uint", "double", "bool", "bytes", "type", "dyn", "timestamp", "duration",
];

/// Raw lexical classification. `Ident` is provisional; the parser promotes
/// identifiers to function/property/variable from context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    /// A quote delimiter, emitted separately from the string body so
    /// editors can distinguish literal text from its delimiters.
    Quote,
    StringBody,
    Keyword,
    Operator,
    Ident,
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
    /// Start column within the lexed line, in characters.
    pub start: u32,
    /// Exclusive end column, in characters.
    pub end: u32,
}

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap();
    static ref SPACE_RE: Regex = Regex::new(r"^[ \t]+").unwrap();
}

const COMPOUND_OPERATORS: &[&str] = &["&&", "||", "==", "!=", "<=", ">="];

fn char_len(text: &str) -> u32 {
    text.chars().count() as u32
}

/// Tokenize one line of expression text.
///
/// An unterminated quoted string is fatal: silently truncating it would
/// desynchronize every following position delta. The error offset is local
/// to this line; callers rebase it onto the absolute source position.
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, ExprError> {
    let mut tokens = Vec::new();
    let mut byte = 0usize;
    let mut col = 0u32;

    while byte < line.len() {
        let rest = &line[byte..];
        let ch = rest.chars().next().unwrap_or_default();

        if let Some(m) = SPACE_RE.find(rest) {
            push(&mut tokens, m.as_str(), TokenKind::Space, &mut col);
            byte += m.end();
            continue;
        }

        if ch.is_ascii_digit() {
            let m = NUMBER_RE.find(rest).expect("digit starts a number");
            push(&mut tokens, m.as_str(), TokenKind::Number, &mut col);
            byte += m.end();
            continue;
        }

        if ch == '\'' || ch == '"' {
            byte += lex_string(rest, ch, &mut tokens, &mut col)?;
            continue;
        }

        if let Some(m) = IDENT_RE.find(rest) {
            let kind = if KEYWORD_FUNCTIONS.contains(&m.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Ident
            };
            push(&mut tokens, m.as_str(), kind, &mut col);
            byte += m.end();
            continue;
        }

        if let Some(op) = COMPOUND_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            push(&mut tokens, &rest[..op.len()], TokenKind::Operator, &mut col);
            byte += op.len();
            continue;
        }

        // Structural single characters; anything unrecognized degrades to
        // an operator so coverage stays contiguous.
        let len = ch.len_utf8();
        push(&mut tokens, &rest[..len], TokenKind::Operator, &mut col);
        byte += len;
    }

    Ok(tokens)
}

fn push<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str, kind: TokenKind, col: &mut u32) {
    let len = char_len(text);
    tokens.push(Token {
        text,
        kind,
        start: *col,
        end: *col + len,
    });
    *col += len;
}

/// Lex a quoted region starting at `rest[0] == quote`. Emits the opening
/// quote, the body, and the closing quote as three tokens. Returns the byte
/// length consumed.
fn lex_string<'a>(
    rest: &'a str,
    quote: char,
    tokens: &mut Vec<Token<'a>>,
    col: &mut u32,
) -> Result<usize, ExprError> {
    let open_col = *col;
    let quote_len = quote.len_utf8();
    let mut escaped = false;
    let mut body_end: Option<usize> = None;

    for (idx, ch) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            c if c == quote => {
                body_end = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let body_end = body_end.ok_or(ExprError::UnterminatedString {
        line: 0,
        offset: open_col,
    })?;

    push(tokens, &rest[..quote_len], TokenKind::Quote, col);
    push(tokens, &rest[quote_len..body_end], TokenKind::StringBody, col);
    push(
        tokens,
        &rest[body_end..body_end + quote_len],
        TokenKind::Quote,
        col,
    );
    Ok(body_end + quote_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn kinds(tokens: &[Token<'_>]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_arithmetic() {
        let tokens = tokenize("1 + 1").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Number,
                TokenKind::Space,
                TokenKind::Operator,
                TokenKind::Space,
                TokenKind::Number,
            ]
        );
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[2].start, 2);
        assert_eq!(tokens[4].start, 4);
    }

    #[test]
    fn test_quoted_string_splits_into_three_tokens() {
        let tokens = tokenize("'this is a lot'").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Quote, TokenKind::StringBody, TokenKind::Quote]
        );
        assert_eq!(tokens[1].text, "this is a lot");
        assert_eq!(tokens[1].start, 1);
        assert_eq!(tokens[2].start, 14);
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        let tokens = tokenize(r#""a\"b""#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, r#"a\"b"#);
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = tokenize("foo + 'bar").unwrap_err();
        assert_matches!(err, ExprError::UnterminatedString { offset: 6, .. });
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = tokenize("has(inputs.name)").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].text, "has");
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[2].text, "inputs");
        assert_eq!(tokens[4].kind, TokenKind::Ident);
        assert_eq!(tokens[4].text, "name");
    }

    #[test]
    fn test_number_forms() {
        for text in ["42", "3.25", "1e9", "6.02e-23"] {
            let tokens = tokenize(text).unwrap();
            assert_eq!(tokens.len(), 1, "{text}");
            assert_eq!(tokens[0].kind, TokenKind::Number);
            assert_eq!(tokens[0].text, text);
        }
    }

    #[test]
    fn test_compound_operators_lex_as_one_token() {
        let tokens = tokenize("a&&b||c==d!=e<=f>=g").unwrap();
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text)
            .collect();
        assert_eq!(ops, vec!["&&", "||", "==", "!=", "<=", ">="]);
    }

    #[test]
    fn test_whitespace_runs_are_kept() {
        let tokens = tokenize("a   +  b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Space);
        assert_eq!(tokens[1].text, "   ");
        assert_eq!(tokens[1].start, 1);
        assert_eq!(tokens[1].end, 4);
    }

    proptest! {
        // Coverage law: spans concatenate over the input with no gaps or
        // overlaps, for any input that lexes successfully.
        #[test]
        fn prop_token_spans_cover_input(line in "[ -~]{0,40}") {
            if let Ok(tokens) = tokenize(&line) {
                let mut cursor = 0u32;
                for token in &tokens {
                    prop_assert_eq!(token.start, cursor);
                    prop_assert_eq!(token.end - token.start, token.text.chars().count() as u32);
                    cursor = token.end;
                }
                prop_assert_eq!(cursor as usize, line.chars().count());
            }
        }
    }
}
