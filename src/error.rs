//! Crate-wide error type.
//!
//! Every failure aborts the whole compilation; there is no partial result.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading, tokenizing or evaluating declarations.
#[derive(Debug, Error)]
pub enum Error {
    /// No declaration text exists for the requested environment name.
    #[error("environment \"{name}\" not found")]
    SourceNotFound { name: String },

    /// No tokenizer pattern matches at the cursor.
    #[error("unrecognized token at line {line}, column {column}:\n{excerpt}")]
    UnrecognizedToken {
        line: usize,
        column: usize,
        /// The offending line fragment with a caret under the cursor.
        excerpt: String,
    },

    /// The tokenizer stopped advancing. Indicates a pattern/context bug.
    #[error("tokenizer stuck at offset {offset} after {attempts} steps without progress")]
    StuckTokenizer { offset: usize, attempts: usize },

    /// An interpolation's operator sequence matches no table entry.
    #[error("unrecognized operator sequence \"{spelling}\" in interpolation of {variable}")]
    UnknownOperator { variable: String, spelling: String },

    /// A JSON declaration file is invalid or does not fit the entry schema.
    #[error("malformed declaration file {file}: {reason}")]
    MalformedDeclarationFile { file: String, reason: String },

    /// A variable depends on itself, directly or transitively.
    #[error("cyclic variable reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// A declaration file includes itself, directly or transitively.
    #[error("cyclic include: {}", chain.join(" -> "))]
    CyclicInclude { chain: Vec<String> },

    /// Two operator table entries claim the same spelling.
    #[error("duplicate operator spelling \"{spelling}\"")]
    DuplicateOperator { spelling: String },

    /// A prefix/suffix/replacement pattern could not be compiled.
    #[error("invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
