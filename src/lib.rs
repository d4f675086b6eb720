//! zenv: compiles named environments from layered `.env` declaration files.
//!
//! A declaration file assigns variables with a bash-flavoured syntax:
//! quoted and unquoted values, comments, `#/include "name"` to splice in
//! another environment, `#/preserve` to make an assignment win over later
//! ones, and `${NAME...}` interpolations with shell-style operators
//! (defaults, alternates, slicing, prefix/suffix trimming, replacement).
//!
//! # Architecture
//!
//! - **[`parse`]**: token arena, context-sensitive tokenizer, canonical renderer.
//! - **[`eval`]**: operator table, glob patterns, memo cache, expression evaluator.
//! - **[`compile`]**: include splicing, override flattening, assembly; the entry points.
//! - **[`source`]**: where declaration text comes from (memory, directories).
//! - **[`formats`]**: classic `.env` and JSON declaration files.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: `simplelog` setup for the binary.
//!
//! ```
//! use zenv::compile::{CompileOptions, compile_env};
//! use zenv::source::MemoryProvider;
//!
//! let provider = MemoryProvider::new()
//!     .with("default", "#/include base\nURL=${HOST:-localhost}:${PORT}\n")
//!     .with("base", "PORT=8080\n");
//! let env = compile_env("default", &provider, &CompileOptions::default()).unwrap();
//! assert_eq!(env["URL"], "localhost:8080");
//! ```

/// The compile pipeline and its passes.
pub mod compile;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Crate-wide error type.
pub mod error;
/// Expression evaluation: operators, patterns, memoization.
pub mod eval;
/// Declaration file formats.
pub mod formats;
/// Logger initialisation.
pub mod logging;
/// Token model, tokenizer and renderer.
pub mod parse;
/// Source-text providers.
pub mod source;

pub use error::{Error, Result};
