use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};

use crate::error::Result;
use crate::eval::{Claim, Evaluator, OperatorTable, Value, VariableCache};
use crate::parse::{TokenId, TokenKind, TokenTree};

/// Resolves every declared variable of a flattened tree, each exactly once.
pub struct Assembler<'t> {
    evaluator: Evaluator<'t>,
    /// Winning assignment per name.
    declarations: HashMap<&'t str, TokenId>,
    /// Declared names in list order.
    order: Vec<&'t str>,
    cache: RefCell<VariableCache>,
}

impl<'t> Assembler<'t> {
    /// `tree` must already be flattened: at most one top-level assignment per name.
    pub fn new(tree: &'t TokenTree, operators: &'t OperatorTable) -> Self {
        let mut declarations = HashMap::new();
        let mut order = Vec::new();
        for &id in tree.top_level() {
            let token = tree.get(id);
            if token.kind == TokenKind::Assignment
                && declarations.insert(token.value.as_str(), id).is_none()
            {
                order.push(token.value.as_str());
            }
        }
        Self {
            evaluator: Evaluator::new(tree, operators),
            declarations,
            order,
            cache: RefCell::new(VariableCache::new()),
        }
    }

    /// Value of `name`, computed on first request and cached.
    ///
    /// Undeclared names are unset.
    pub fn resolve(&self, name: &str) -> Result<Value> {
        let claim = self.cache.borrow_mut().claim(name)?;
        if let Claim::Cached(value) = claim {
            return Ok(value);
        }

        let value = match self.declarations.get(name) {
            Some(&id) => {
                let lookup = |other: &str| self.resolve(other);
                match self.evaluator.resolve(id, &lookup) {
                    Ok(value) => value,
                    Err(e) => {
                        self.cache.borrow_mut().abandon(name);
                        return Err(e);
                    }
                }
            }
            None => None,
        };
        trace!("resolved {name} = {value:?}");
        self.cache.borrow_mut().finish(name, value.clone());
        Ok(value)
    }

    /// Resolve every declared name; unset results are left out.
    pub fn assemble(self) -> Result<BTreeMap<String, String>> {
        for name in &self.order {
            self.resolve(name)?;
        }
        let environment = self.cache.into_inner().into_environment();
        debug!("assembled {} variables", environment.len());
        Ok(environment)
    }
}
