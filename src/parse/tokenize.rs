//! Context-sensitive tokenizer for declaration text.
//!
//! Patterns are tried in order at the cursor; the first one that matches and
//! is legal inside the currently open block wins. Handlers either emit a leaf,
//! open a block (later tokens become its children) or close the nearest block
//! of some kind. The open blocks form a stack whose bottom is the MAIN root.

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::types::{Modifier, Token, TokenId, TokenKind, TokenTree};
use crate::error::{Error, Result};
use crate::eval::OperatorTable;

/// Consecutive zero-length steps tolerated before tokenizing fails.
pub const DEFAULT_NO_PROGRESS_LIMIT: usize = 20;

/// Returns the number of bytes consumed.
type Handler = fn(&mut Tokenizer<'_>, &Captures<'_>) -> usize;

struct Pattern {
    regex: Regex,
    handler: Handler,
    inside: &'static [TokenKind],
}

fn pattern(regex: &str, handler: Handler, inside: &'static [TokenKind]) -> Pattern {
    Pattern {
        regex: Regex::new(&format!(r"\A(?:{regex})")).expect("tokenizer patterns must compile"),
        handler,
        inside,
    }
}

use TokenKind::{
    Assignment, Comment, IncludeFlag, Interpolation, InterpolationExpression, Main, PreserveFlag,
    QuotedString, String as Text,
};

const ANYWHERE: &[TokenKind] = &[Main, Assignment, Interpolation, InterpolationExpression, QuotedString];
const VALUES: &[TokenKind] = &[Assignment, InterpolationExpression, QuotedString];
const INTERPOLATIONS: &[TokenKind] = &[Interpolation, InterpolationExpression];

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        // flags
        pattern(r#"# ?/ *(?i:include) +"?([-0-9A-Za-z_.$%]+)"?"#, include, &[Main]),
        pattern(r"# ?/ *(?i:preserve) *", preserve, &[Main]),
        // escaped characters
        pattern(r"\\(.)", escaped, ANYWHERE),
        // assignments
        pattern(r"([A-Z_0-9]+)=[ \t]*", open_assignment, &[Main]),
        pattern(r"(?mR:$)", close_assignment, &[Assignment]),
        pattern(r"[ \t]+(?mR:$)", discard, &[Assignment]),
        // interpolations
        pattern(r"\$\{ *# *([A-Z_0-9]+) *", open_length_interpolation, VALUES),
        pattern(r"\$\{ *([A-Z_0-9]+) *", open_interpolation, VALUES),
        pattern(r"\}", close_interpolation, INTERPOLATIONS),
        pattern(r"[-:/#%|?&+]{1,2}", operator, INTERPOLATIONS),
        pattern(r"\$([A-Z_0-9]+)", shorthand_interpolation, VALUES),
        // quoted strings
        pattern(r#"""#, open_quote, &[Assignment, InterpolationExpression]),
        pattern(r#"""#, close_quote, &[QuotedString]),
        // comments
        pattern(r"(?R)# ?(.*)", comment, &[Main, Assignment]),
        // whitespace only matters inside values
        pattern(r"\s+", discard, &[Main, Interpolation]),
        // implicit strings
        pattern(r#"[^\n\r$"\\]*[^\s$"\\]|[ \t]+|."#, string, &[Assignment]),
        pattern(r#"(?s:[^$"\\]+|.)"#, string, &[QuotedString]),
        pattern(r"[0-9A-Za-z_ ]+|.", string, &[InterpolationExpression]),
    ]
});

fn include(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push(Token::new(IncludeFlag, &caps[1]));
    caps[0].len()
}

fn preserve(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push(Token::new(PreserveFlag, ""));
    caps[0].len()
}

fn escaped(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push_string(&caps[1]);
    caps[0].len()
}

fn open_assignment(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.open(Token::new(Assignment, &caps[1]));
    caps[0].len()
}

fn close_assignment(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.close_nearest(Assignment);
    caps[0].len()
}

fn discard(_: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    caps[0].len()
}

fn open_length_interpolation(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.open(Token::new(Interpolation, &caps[1]).with_modifier(Modifier::Length));
    caps[0].len()
}

fn open_interpolation(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.open(Token::new(Interpolation, &caps[1]));
    caps[0].len()
}

fn close_interpolation(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.close_nearest(Interpolation);
    caps[0].len()
}

/// An operator run inside an interpolation.
///
/// The two-character spelling is preferred over the one-character one, and
/// either only counts if it extends the interpolation's operator sequence
/// towards a known spelling. Otherwise the first operator is kept as written
/// (it fails at evaluation) and later ones are literal argument text.
fn operator(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    let run = &caps[0];
    let prior = t.expression_spellings();
    let mut candidates = vec![run];
    if run.len() == 2 {
        candidates.push(&run[..1]);
    }

    match candidates
        .into_iter()
        .find(|symbol| t.operators.continues(&prior, symbol))
    {
        Some(symbol) => {
            t.open_expression(symbol);
            symbol.len()
        }
        None if prior.is_empty() => {
            t.open_expression(run);
            run.len()
        }
        None => {
            t.push_string(&run[..1]);
            1
        }
    }
}

fn shorthand_interpolation(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push(Token::new(Interpolation, &caps[1]));
    caps[0].len()
}

fn open_quote(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.open(Token::new(QuotedString, ""));
    caps[0].len()
}

fn close_quote(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.close_nearest(QuotedString);
    caps[0].len()
}

fn comment(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push(Token::new(Comment, &caps[1]));
    caps[0].len()
}

fn string(t: &mut Tokenizer<'_>, caps: &Captures<'_>) -> usize {
    t.push_string(&caps[0]);
    caps[0].len()
}

/// Turns declaration text into a [`TokenTree`].
///
/// The tokenizer exclusively owns its cursor, block stack and no-progress
/// counter; it is consumed by [`Tokenizer::tokenize`].
pub struct Tokenizer<'s> {
    source: &'s str,
    cursor: usize,
    tree: TokenTree,
    stack: Vec<TokenId>,
    no_progress: usize,
    no_progress_limit: usize,
    operators: &'static OperatorTable,
}

impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s str) -> Self {
        let tree = TokenTree::new();
        let root = tree.root();
        Self {
            source,
            cursor: 0,
            tree,
            stack: vec![root],
            no_progress: 0,
            no_progress_limit: DEFAULT_NO_PROGRESS_LIMIT,
            operators: OperatorTable::builtin(),
        }
    }

    /// Fail after this many consecutive steps that consume nothing.
    pub fn no_progress_limit(mut self, limit: usize) -> Self {
        self.no_progress_limit = limit.max(1);
        self
    }

    /// Tokenize a whole declaration file.
    pub fn tokenize(mut self) -> Result<TokenTree> {
        self.run()?;
        debug!(
            "tokenized {} bytes into {} top-level tokens",
            self.source.len(),
            self.tree.top_level().len()
        );
        Ok(self.tree)
    }

    /// Tokenize `source` as the value of one anonymous assignment.
    ///
    /// Returns the tree and the assignment token. Leading and trailing blanks
    /// are dropped as in `NAME=value`; the value ends at the first line break.
    pub fn tokenize_value(mut self) -> Result<(TokenTree, TokenId)> {
        let id = self.push(Token::new(Assignment, ""));
        self.stack.push(id);
        self.cursor = self.source.len() - self.source.trim_start_matches([' ', '\t']).len();
        self.run()?;
        Ok((self.tree, id))
    }

    fn run(&mut self) -> Result<()> {
        while self.cursor < self.source.len() {
            let consumed = self.step()?;
            self.cursor += consumed;
            if consumed > 0 {
                self.no_progress = 0;
                continue;
            }
            self.no_progress += 1;
            if self.no_progress >= self.no_progress_limit {
                return Err(Error::StuckTokenizer {
                    offset: self.cursor,
                    attempts: self.no_progress,
                });
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<usize> {
        let context = self.tree.kind(self.current());
        let source = self.source;
        let rest = &source[self.cursor..];
        for pattern in PATTERNS.iter() {
            if !pattern.inside.contains(&context) {
                continue;
            }
            if let Some(caps) = pattern.regex.captures(rest) {
                return Ok((pattern.handler)(self, &caps));
            }
        }
        Err(self.unrecognized())
    }

    fn current(&self) -> TokenId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn push(&mut self, token: Token) -> TokenId {
        let parent = self.current();
        self.tree.append(parent, token)
    }

    fn open(&mut self, token: Token) {
        let id = self.push(token);
        self.stack.push(id);
    }

    /// Append literal text, merging with a preceding STRING sibling.
    fn push_string(&mut self, text: &str) {
        let parent = self.current();
        if let Some(&last) = self.tree.children(parent).last()
            && self.tree.kind(last) == Text
        {
            self.tree.get_mut(last).value.push_str(text);
            return;
        }
        self.push(Token::new(Text, text));
    }

    /// Pop blocks until one of `kind` has been popped. Never pops the root.
    fn close_nearest(&mut self, kind: TokenKind) {
        while self.stack.len() > 1 {
            let closed = self.stack.pop().map(|id| self.tree.kind(id));
            if closed == Some(kind) {
                break;
            }
        }
    }

    /// Pop blocks until one of `kind` is on top. Never pops the root.
    fn close_up_to_nearest(&mut self, kind: TokenKind) {
        while self.stack.len() > 1 && self.tree.kind(self.current()) != kind {
            self.stack.pop();
        }
    }

    fn open_expression(&mut self, symbol: &str) {
        self.close_up_to_nearest(Interpolation);
        self.open(Token::new(InterpolationExpression, symbol));
    }

    /// Operator text of the expressions already under the innermost open interpolation.
    fn expression_spellings(&self) -> Vec<String> {
        let Some(interpolation) = self
            .stack
            .iter()
            .rev()
            .copied()
            .find(|&id| self.tree.kind(id) == Interpolation)
        else {
            return Vec::new();
        };
        self.tree
            .children(interpolation)
            .iter()
            .filter(|&&id| self.tree.kind(id) == InterpolationExpression)
            .map(|&id| self.tree.get(id).value.clone())
            .collect()
    }

    fn unrecognized(&self) -> Error {
        let before = &self.source[..self.cursor];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        let line_end = self.source[self.cursor..]
            .find('\n')
            .map_or(self.source.len(), |i| self.cursor + i);
        let text = self.source[line_start..line_end].trim_end_matches('\r');
        Error::UnrecognizedToken {
            line,
            column,
            excerpt: format!("{text}\n{}^", " ".repeat(column - 1)),
        }
    }
}
