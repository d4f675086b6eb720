use once_cell::sync::Lazy;
use regex::Regex;

use super::DeclarationFormat;
use crate::error::Result;

static DOTTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.env(?:\.(?<name>.+))?$").expect("classic file pattern"));
static SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?<name>.+)\.env$").expect("classic file pattern"));

/// `.env`, `.env.<name>` and `<name>.env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classic;

impl DeclarationFormat for Classic {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn candidate_file_names(&self, environment: &str, default_environment: &str) -> Vec<String> {
        let environment = environment.trim();
        if environment == default_environment {
            vec![".env".to_string()]
        } else {
            vec![format!(".env.{environment}"), format!("{environment}.env")]
        }
    }

    fn environment_name(&self, file_name: &str, default_environment: &str) -> Option<String> {
        let caps = DOTTED
            .captures(file_name)
            .or_else(|| SUFFIXED.captures(file_name))?;
        Some(caps.name("name").map_or(default_environment, |m| m.as_str()).to_string())
    }

    fn to_declaration_text(&self, content: &str, _file: &str) -> Result<String> {
        Ok(content.to_string())
    }
}
