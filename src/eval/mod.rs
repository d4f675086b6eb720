//! Expression evaluation: resolves tokens to values.
//!
//! Variables are looked up through a caller-supplied callback, so the same
//! evaluator serves the assembler's memoized lookup and any one-off caller.

pub mod cache;
pub mod operators;
pub mod pattern;

pub use cache::{Claim, VariableCache};
pub use operators::{Args, Operator, OperatorTable, Thunk, Value};

use crate::error::{Error, Result};
use crate::parse::{Modifier, TokenId, TokenKind, TokenTree};

/// Variable-resolution callback: name to value (`None` when unset).
pub type Lookup<'a> = dyn Fn(&str) -> Result<Value> + 'a;

/// Resolves tokens of one tree against an operator table.
#[derive(Clone, Copy)]
pub struct Evaluator<'t> {
    tree: &'t TokenTree,
    operators: &'t OperatorTable,
}

impl<'t> Evaluator<'t> {
    pub fn new(tree: &'t TokenTree, operators: &'t OperatorTable) -> Self {
        Self { tree, operators }
    }

    /// Resolve the token at `id`.
    ///
    /// Containers concatenate their children; comments and flags have no value.
    pub fn resolve(&self, id: TokenId, lookup: &Lookup<'_>) -> Result<Value> {
        let token = self.tree.get(id);
        match token.kind {
            TokenKind::String => Ok(Some(token.value.clone())),
            TokenKind::Assignment
            | TokenKind::InterpolationExpression
            | TokenKind::QuotedString => {
                let mut out = String::new();
                for &child in &token.children {
                    if let Some(part) = self.resolve(child, lookup)? {
                        out.push_str(&part);
                    }
                }
                Ok(Some(out))
            }
            TokenKind::Interpolation => self.interpolate(id, lookup),
            TokenKind::Main
            | TokenKind::Comment
            | TokenKind::IncludeFlag
            | TokenKind::PreserveFlag => Ok(None),
        }
    }

    fn interpolate(&self, id: TokenId, lookup: &Lookup<'_>) -> Result<Value> {
        let token = self.tree.get(id);
        let expressions: Vec<TokenId> = token
            .children
            .iter()
            .copied()
            .filter(|&child| self.tree.kind(child) == TokenKind::InterpolationExpression)
            .collect();

        let spelling = expressions
            .iter()
            .map(|&e| self.tree.get(e).value.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let operator = self
            .operators
            .find(&spelling)
            .ok_or_else(|| Error::UnknownOperator {
                variable: token.value.clone(),
                spelling: spelling.clone(),
            })?;

        let value = lookup(&token.value)?;
        let thunks: Vec<Thunk<'_>> = expressions
            .into_iter()
            .map(|e| Box::new(move || self.resolve(e, lookup)) as Thunk<'_>)
            .collect();
        let result = operator.apply(value, &Args::new(thunks))?;

        if token.has_modifier(Modifier::Length) {
            let count = result.map_or(0, |r| r.chars().count());
            return Ok(Some(count.to_string()));
        }
        Ok(result)
    }
}
