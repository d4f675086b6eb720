use std::rc::Rc;

use log::debug;

use super::CompileOptions;
use crate::error::{Error, Result};
use crate::parse::{TokenId, TokenKind, TokenTree, Tokenizer};
use crate::source::SourceProvider;

/// Replace every top-level INCLUDE_FLAG with the top-level tokens of the
/// source it names, until none are left.
///
/// Spliced tokens land at the same level, so nested includes resolve in
/// later iterations. Every token remembers the chain of names that brought
/// it in; including a name already on that chain is a cycle. `origin` is the
/// name of the source `tree` was tokenized from.
pub fn merge_includes<P: SourceProvider + ?Sized>(
    tree: &mut TokenTree,
    provider: &P,
    options: &CompileOptions,
    origin: &str,
) -> Result<()> {
    let root_chain: Rc<Vec<String>> = Rc::new(vec![origin.to_string()]);
    let mut entries: Vec<(TokenId, Rc<Vec<String>>)> = tree
        .top_level()
        .iter()
        .map(|&id| (id, Rc::clone(&root_chain)))
        .collect();

    let mut i = 0;
    while i < entries.len() {
        let (id, chain) = &entries[i];
        if tree.kind(*id) != TokenKind::IncludeFlag {
            i += 1;
            continue;
        }

        let name = tree.get(*id).value.clone();
        let mut next = chain.as_ref().clone();
        next.push(name.clone());
        if chain.contains(&name) {
            return Err(Error::CyclicInclude { chain: next });
        }

        let text = provider.provide(&name, &options.load)?;
        let included = Tokenizer::new(&text)
            .no_progress_limit(options.no_progress_limit)
            .tokenize()?;
        let spliced = tree.graft(included);
        debug!("included \"{name}\": {} top-level tokens", spliced.len());

        let next = Rc::new(next);
        entries.splice(i..=i, spliced.into_iter().map(|id| (id, Rc::clone(&next))));
    }

    tree.set_top_level(entries.into_iter().map(|(id, _)| id).collect());
    Ok(())
}
