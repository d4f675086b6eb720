//! Canonical text for a token tree.
//!
//! Rendering and tokenizing again yields an equivalent tree. Shorthand
//! interpolations come back in braced form and literal text is escaped
//! wherever the tokenizer would otherwise read it as syntax.

use super::types::{Modifier, TokenId, TokenKind, TokenTree};

/// Where a STRING sits; each place has its own special characters.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Place {
    Value,
    Quoted,
    Expression,
}

/// Render every reachable top-level token, one per line.
pub fn render(tree: &TokenTree) -> String {
    let mut out = String::new();
    for &id in tree.top_level() {
        let token = tree.get(id);
        match token.kind {
            TokenKind::IncludeFlag => {
                out.push_str("#/include \"");
                out.push_str(&token.value);
                out.push('"');
            }
            TokenKind::PreserveFlag => out.push_str("#/preserve"),
            TokenKind::Comment => {
                out.push_str("# ");
                out.push_str(&token.value);
            }
            TokenKind::Assignment => {
                out.push_str(&token.value);
                out.push('=');
                render_children(tree, id, Place::Value, &mut out);
            }
            _ => render_token(tree, id, Place::Value, false, false, &mut out),
        }
        out.push('\n');
    }
    out
}

/// A quoted literal whose tokenized value is exactly `value`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    escape_into(value, Place::Quoted, &mut out);
    out.push('"');
    out
}

fn render_children(tree: &TokenTree, id: TokenId, place: Place, out: &mut String) {
    let children = tree.children(id);
    for (i, &child) in children.iter().enumerate() {
        render_token(tree, child, place, i == 0, i + 1 == children.len(), out);
    }
}

fn render_token(
    tree: &TokenTree,
    id: TokenId,
    place: Place,
    first: bool,
    last: bool,
    out: &mut String,
) {
    let token = tree.get(id);
    match token.kind {
        TokenKind::String => render_string(&token.value, place, first, last, out),
        TokenKind::QuotedString => {
            out.push('"');
            render_children(tree, id, Place::Quoted, out);
            out.push('"');
        }
        TokenKind::Interpolation => {
            out.push_str("${");
            if token.has_modifier(Modifier::Length) {
                out.push('#');
            }
            out.push_str(&token.value);
            for &child in &token.children {
                render_token(tree, child, Place::Expression, false, false, out);
            }
            out.push('}');
        }
        TokenKind::InterpolationExpression => {
            out.push_str(&token.value);
            render_children(tree, id, Place::Expression, out);
        }
        TokenKind::Comment => {
            out.push_str("# ");
            out.push_str(&token.value);
        }
        TokenKind::Main
        | TokenKind::Assignment
        | TokenKind::IncludeFlag
        | TokenKind::PreserveFlag => {}
    }
}

fn render_string(text: &str, place: Place, first: bool, last: bool, out: &mut String) {
    let multiline = text.contains(['\n', '\r']);
    if place != Place::Quoted && multiline {
        out.push_str(&quote(text));
        return;
    }
    if place != Place::Value {
        escape_into(text, place, out);
        return;
    }

    // Unquoted values lose leading and trailing blanks unless escaped.
    let body = text.trim_matches([' ', '\t']);
    if body.is_empty() {
        push_blanks(text, first || last, out);
        return;
    }
    let start = text.len() - text.trim_start_matches([' ', '\t']).len();
    let (lead, tail) = (&text[..start], &text[start + body.len()..]);
    push_blanks(lead, first, out);
    escape_into(body, place, out);
    push_blanks(tail, last, out);
}

fn push_blanks(blanks: &str, escaped: bool, out: &mut String) {
    for c in blanks.chars() {
        if escaped {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_into(text: &str, place: Place, out: &mut String) {
    for c in text.chars() {
        let special = match place {
            Place::Quoted => matches!(c, '\\' | '"' | '$'),
            Place::Value => matches!(c, '\\' | '"' | '$' | '#'),
            Place::Expression => {
                matches!(c, '\\' | '"' | '$' | '}') || "-:/#%|?&+".contains(c)
            }
        };
        if special {
            out.push('\\');
        }
        out.push(c);
    }
}
