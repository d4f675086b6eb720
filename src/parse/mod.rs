pub mod render;
pub mod tokenize;
pub mod types;

pub use render::{quote, render};
pub use tokenize::{DEFAULT_NO_PROGRESS_LIMIT, Tokenizer};
pub use types::{Modifier, Token, TokenId, TokenKind, TokenTree};
