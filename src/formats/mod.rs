//! Declaration file formats: file naming and conversion to declaration text.
//!
//! Every format turns its files into the plain declaration dialect, so the
//! tokenizer pipeline is the only place variables are parsed and expanded.

/// Plain `.env` files, passed through as-is.
pub mod classic;
/// `env.json` files holding literal name/value/preserve entries.
pub mod json;

use log::warn;

use crate::error::Result;
use crate::parse::quote;

pub use classic::Classic;
pub use json::Json;

/// A family of declaration files sharing a naming scheme and syntax.
pub trait DeclarationFormat: Send + Sync {
    /// Name used in configuration (`[loader] formats`).
    fn name(&self) -> &'static str;

    /// File names that hold `environment`, in lookup order.
    fn candidate_file_names(&self, environment: &str, default_environment: &str) -> Vec<String>;

    /// Environment held by a file of this format, or `None` if the file
    /// name does not belong to the format.
    fn environment_name(&self, file_name: &str, default_environment: &str) -> Option<String>;

    /// Convert file content into declaration text.
    fn to_declaration_text(&self, content: &str, file: &str) -> Result<String>;
}

/// One literal variable supplied by a non-expanding format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVariableEntry {
    pub name: String,
    /// `None` leaves the variable unset.
    pub value: Option<String>,
    pub preserve: bool,
}

/// Every format this crate knows, in default precedence order.
pub fn builtin() -> Vec<Box<dyn DeclarationFormat>> {
    vec![Box::new(Classic), Box::new(Json)]
}

pub fn by_name(name: &str) -> Option<Box<dyn DeclarationFormat>> {
    builtin().into_iter().find(|format| format.name() == name)
}

/// Formats for the configured names, skipping (and reporting) unknown ones.
pub fn from_names(names: &[String]) -> Vec<Box<dyn DeclarationFormat>> {
    names
        .iter()
        .filter_map(|name| {
            let format = by_name(name);
            if format.is_none() {
                warn!("ignoring unknown declaration format \"{name}\"");
            }
            format
        })
        .collect()
}

/// Declaration text assigning each entry's value literally.
///
/// Unset entries are left out; preserved ones get a `#/preserve` line.
pub fn render_entries(entries: &[EnvironmentVariableEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let Some(value) = &entry.value else {
            continue;
        };
        if entry.preserve {
            out.push_str("#/preserve\n");
        }
        out.push_str(&entry.name);
        out.push('=');
        out.push_str(&quote(value));
        out.push('\n');
    }
    out
}
