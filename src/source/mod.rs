//! Where declaration text comes from.
//!
//! The compile pipeline never touches the filesystem itself: it asks a
//! [`SourceProvider`] for the text of an environment, and again for every
//! included name.

/// Declaration files on disk.
pub mod directory;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub use directory::{DirectoryProvider, EnvironmentFile};

/// Where and how a provider looks for declaration text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub dir: PathBuf,
    /// Search subdirectories when `dir` holds nothing for a name.
    pub recursive: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            recursive: false,
        }
    }
}

/// Supplies declaration text by environment (or include) name.
pub trait SourceProvider {
    /// Fails with [`Error::SourceNotFound`] when nothing matches `name`.
    fn provide(&self, name: &str, options: &LoadOptions) -> Result<String>;
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn provide(&self, name: &str, options: &LoadOptions) -> Result<String> {
        (**self).provide(name, options)
    }
}

/// Fixed name → text map. Ignores load options.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    sources: HashMap<String, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryProvider::insert`].
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(name.into(), text.into());
    }
}

impl SourceProvider for MemoryProvider {
    fn provide(&self, name: &str, _options: &LoadOptions) -> Result<String> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_lookup() {
        let provider = MemoryProvider::new().with("default", "A=1");
        let options = LoadOptions::default();
        assert_eq!(provider.provide("default", &options).unwrap(), "A=1");
        let err = provider.provide("missing", &options).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { name } if name == "missing"));
    }
}
