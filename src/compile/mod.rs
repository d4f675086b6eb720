//! The compile pipeline: tokenize, splice includes, flatten overrides, assemble.

/// Memoized resolution of every declared variable.
pub mod assemble;
/// Include splicing.
pub mod includes;
/// "Last write wins unless preserved."
pub mod overrides;

use std::collections::BTreeMap;

use log::debug;

use crate::config::{Config, expand_path};
use crate::error::Result;
use crate::eval::{Evaluator, Lookup, OperatorTable, Value};
use crate::parse::{DEFAULT_NO_PROGRESS_LIMIT, TokenTree, Tokenizer};
use crate::source::{LoadOptions, SourceProvider};

pub use assemble::Assembler;
pub use includes::merge_includes;
pub use overrides::flatten_overrides;

/// Knobs for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Passed to the source provider for the environment and every include.
    pub load: LoadOptions,
    pub no_progress_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            no_progress_limit: DEFAULT_NO_PROGRESS_LIMIT,
        }
    }
}

impl From<&Config> for CompileOptions {
    fn from(config: &Config) -> Self {
        Self {
            load: LoadOptions {
                dir: expand_path(&config.loader.dir),
                recursive: config.loader.recursive,
            },
            no_progress_limit: config.tokenizer.no_progress_limit,
        }
    }
}

/// Compile environment `name` into its resolved variables.
pub fn compile_env<P: SourceProvider + ?Sized>(
    name: &str,
    provider: &P,
    options: &CompileOptions,
) -> Result<BTreeMap<String, String>> {
    let text = provider.provide(name, &options.load)?;
    compile_source(&text, name, provider, options)
}

/// Compile declaration text directly. Includes still go through `provider`.
pub fn compile_str<P: SourceProvider + ?Sized>(
    text: &str,
    provider: &P,
    options: &CompileOptions,
) -> Result<BTreeMap<String, String>> {
    compile_source(text, "<input>", provider, options)
}

/// Tokenize `text` and run the structural passes, leaving a tree ready for
/// assembly.
pub fn prepare<P: SourceProvider + ?Sized>(
    text: &str,
    origin: &str,
    provider: &P,
    options: &CompileOptions,
) -> Result<TokenTree> {
    let mut tree = Tokenizer::new(text)
        .no_progress_limit(options.no_progress_limit)
        .tokenize()?;
    merge_includes(&mut tree, provider, options, origin)?;
    flatten_overrides(&mut tree);
    Ok(tree)
}

fn compile_source<P: SourceProvider + ?Sized>(
    text: &str,
    origin: &str,
    provider: &P,
    options: &CompileOptions,
) -> Result<BTreeMap<String, String>> {
    debug!("compiling {origin}");
    let tree = prepare(text, origin, provider, options)?;
    Assembler::new(&tree, OperatorTable::builtin()).assemble()
}

/// Evaluate a single assignment body, such as `${HOME:-/root}/bin`, against
/// an arbitrary variable lookup.
pub fn expand(text: &str, lookup: &Lookup<'_>) -> Result<Value> {
    let (tree, id) = Tokenizer::new(text).tokenize_value()?;
    Evaluator::new(&tree, OperatorTable::builtin()).resolve(id, lookup)
}
