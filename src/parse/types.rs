//! Token tree produced by the tokenizer and consumed by the compile passes.
//!
//! Tokens live in an arena ([`TokenTree`]) and refer to their children by
//! [`TokenId`]. A child is listed under exactly one parent, so the tree is
//! acyclic by construction. Removing a token only unlinks it; the node stays
//! in the arena, unreachable.

use std::collections::BTreeSet;
use std::fmt::Write;

/// Kind of a token node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Tree root; one per tokenized source.
    Main,
    /// `NAME=...`; value is the variable name.
    Assignment,
    /// `${NAME...}` or `$NAME`; value is the referenced variable name.
    Interpolation,
    /// One operator plus its argument; value is the operator text.
    InterpolationExpression,
    /// `"..."`
    QuotedString,
    /// Literal text.
    String,
    /// `# ...`; value is the comment text.
    Comment,
    /// `#/include "name"`; value is the included name.
    IncludeFlag,
    /// `#/preserve`
    PreserveFlag,
}

impl TokenKind {
    /// The kind's display name, as shown in tree dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Main => "MAIN",
            TokenKind::Assignment => "ASSIGNMENT",
            TokenKind::Interpolation => "INTERPOLATION",
            TokenKind::InterpolationExpression => "INTERPOLATION_EXPRESSION",
            TokenKind::QuotedString => "QUOTED_STRING",
            TokenKind::String => "STRING",
            TokenKind::Comment => "COMMENT",
            TokenKind::IncludeFlag => "INCLUDE_FLAG",
            TokenKind::PreserveFlag => "PRESERVE_FLAG",
        }
    }
}

/// Flags attached to a token by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    /// `${#NAME}`: the interpolation yields the character count of its result.
    Length,
}

/// Index of a token inside its [`TokenTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(usize);

/// A single node of the tree.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub children: Vec<TokenId>,
    pub modifiers: BTreeSet<Modifier>,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            children: Vec::new(),
            modifiers: BTreeSet::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

/// Arena holding every token of one tokenized source (plus anything grafted in).
#[derive(Debug, Clone)]
pub struct TokenTree {
    nodes: Vec<Token>,
    root: TokenId,
}

impl Default for TokenTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenTree {
    /// An empty tree holding only a MAIN root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Token::new(TokenKind::Main, "")],
            root: TokenId(0),
        }
    }

    pub fn root(&self) -> TokenId {
        self.root
    }

    pub fn get(&self, id: TokenId) -> &Token {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: TokenId) -> TokenKind {
        self.get(id).kind
    }

    pub fn children(&self, id: TokenId) -> &[TokenId] {
        &self.get(id).children
    }

    /// Children of the root.
    pub fn top_level(&self) -> &[TokenId] {
        self.children(self.root)
    }

    /// Replace the root's child list (used by the splice and flatten passes).
    pub fn set_top_level(&mut self, children: Vec<TokenId>) {
        let root = self.root;
        self.get_mut(root).children = children;
    }

    /// Store a token without linking it anywhere.
    pub fn alloc(&mut self, token: Token) -> TokenId {
        self.nodes.push(token);
        TokenId(self.nodes.len() - 1)
    }

    /// Store a token as the last child of `parent`.
    pub fn append(&mut self, parent: TokenId, token: Token) -> TokenId {
        let id = self.alloc(token);
        self.get_mut(parent).children.push(id);
        id
    }

    /// Move every node of `other` into this arena.
    ///
    /// Returns the ids, in this arena, of `other`'s top-level tokens. They are
    /// not linked under this tree's root; the caller decides where they go.
    pub fn graft(&mut self, other: TokenTree) -> Vec<TokenId> {
        let offset = self.nodes.len();
        let other_root = other.root;
        let top_level: Vec<TokenId> = other
            .children(other_root)
            .iter()
            .map(|id| TokenId(id.0 + offset))
            .collect();
        for mut token in other.nodes {
            for child in &mut token.children {
                child.0 += offset;
            }
            self.nodes.push(token);
        }
        top_level
    }

    /// Structural equality of the subtree at `id` with the subtree at
    /// `other_id` in `other`: kinds, values, modifiers and children in order.
    pub fn equivalent(&self, id: TokenId, other: &TokenTree, other_id: TokenId) -> bool {
        let (a, b) = (self.get(id), other.get(other_id));
        a.kind == b.kind
            && a.value == b.value
            && a.modifiers == b.modifiers
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(&x, &y)| self.equivalent(x, other, y))
    }

    /// Indented, one-token-per-line dump of the reachable tree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(self.root, 0, &mut out);
        out
    }

    fn dump_into(&self, id: TokenId, depth: usize, out: &mut String) {
        let token = self.get(id);
        let _ = write!(out, "{}{} ({})", "  ".repeat(depth), token.kind.as_str(), token.value);
        for modifier in &token.modifiers {
            let _ = write!(out, " [{modifier:?}]");
        }
        out.push('\n');
        for &child in &token.children {
            self.dump_into(child, depth + 1, out);
        }
    }
}
