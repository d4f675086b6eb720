use std::collections::{HashMap, HashSet};

use log::debug;

use crate::parse::{TokenKind, TokenTree};

/// Keep one ASSIGNMENT per name and unlink the rest.
///
/// The winner is the first assignment directly preceded by a PRESERVE_FLAG,
/// or the last one when none is. Adjacency is judged on the list before
/// anything is removed. Other tokens keep their relative order.
pub fn flatten_overrides(tree: &mut TokenTree) {
    let top = tree.top_level().to_vec();
    let mut winners: HashMap<&str, usize> = HashMap::new();
    let mut preserved: HashSet<&str> = HashSet::new();

    for (i, &id) in top.iter().enumerate() {
        let token = tree.get(id);
        if token.kind != TokenKind::Assignment {
            continue;
        }
        let name = token.value.as_str();
        if preserved.contains(name) {
            continue;
        }
        if i > 0 && tree.kind(top[i - 1]) == TokenKind::PreserveFlag {
            preserved.insert(name);
        }
        winners.insert(name, i);
    }

    let kept: Vec<_> = top
        .iter()
        .enumerate()
        .filter(|&(i, &id)| {
            let token = tree.get(id);
            token.kind != TokenKind::Assignment || winners.get(token.value.as_str()) == Some(&i)
        })
        .map(|(_, &id)| id)
        .collect();

    debug!(
        "{} assignments for {} variables ({} preserved)",
        top.iter().filter(|&&id| tree.kind(id) == TokenKind::Assignment).count(),
        winners.len(),
        preserved.len()
    );
    tree.set_top_level(kept);
}
