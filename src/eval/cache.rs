//! Per-compilation memo of resolved variables.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

use super::operators::Value;

#[derive(Debug)]
enum Slot {
    /// Resolution started and has not finished yet.
    InProgress,
    Resolved(Value),
}

/// Outcome of asking the cache to start resolving a name.
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// Already resolved; here is the value.
    Cached(Value),
    /// The caller now owns resolution and must call [`VariableCache::finish`].
    Started,
}

/// Memo of variable values, computed at most once each.
///
/// A request for a name whose resolution is still running means the name
/// depends on itself: resolution is sequential, so the in-flight computation
/// is an ancestor of the request.
#[derive(Debug, Default)]
pub struct VariableCache {
    slots: HashMap<String, Slot>,
    /// Names currently in flight, outermost first.
    pending: Vec<String>,
}

impl VariableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> Result<Claim> {
        match self.slots.get(name) {
            Some(Slot::Resolved(value)) => Ok(Claim::Cached(value.clone())),
            Some(Slot::InProgress) => {
                let start = self.pending.iter().position(|p| p == name).unwrap_or(0);
                let mut chain = self.pending[start..].to_vec();
                chain.push(name.to_string());
                Err(Error::CyclicReference { chain })
            }
            None => {
                self.slots.insert(name.to_string(), Slot::InProgress);
                self.pending.push(name.to_string());
                Ok(Claim::Started)
            }
        }
    }

    pub fn finish(&mut self, name: &str, value: Value) {
        self.pending.retain(|p| p != name);
        self.slots.insert(name.to_string(), Slot::Resolved(value));
    }

    /// Forget a claim whose resolution failed, so a later request starts over.
    pub fn abandon(&mut self, name: &str) {
        self.pending.retain(|p| p != name);
        if matches!(self.slots.get(name), Some(Slot::InProgress)) {
            self.slots.remove(name);
        }
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Resolved(_)))
    }

    /// Every resolved, set variable.
    pub fn into_environment(self) -> BTreeMap<String, String> {
        self.slots
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Resolved(Some(value)) => Some((name, value)),
                _ => None,
            })
            .collect()
    }
}
