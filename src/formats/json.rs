use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{DeclarationFormat, EnvironmentVariableEntry, render_entries};
use crate::error::{Error, Result};

static PREFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?<name>.+)\.)?env\.json$").expect("json file pattern"));
static INFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^env(?:\.(?<name>.+))?\.json$").expect("json file pattern"));
static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("variable name pattern"));

/// A value is either a bare string or `{ "value": ..., "preserve": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Plain(String),
    Detailed {
        value: Option<String>,
        #[serde(default)]
        preserve: bool,
    },
}

/// `env.json`, `<name>.env.json` and `env.<name>.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    /// Parse a JSON object of entries, in file order. Names are upper-cased.
    pub fn parse(content: &str, file: &str) -> Result<Vec<EnvironmentVariableEntry>> {
        let malformed = |reason: String| Error::MalformedDeclarationFile {
            file: file.to_string(),
            reason,
        };
        let raw: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;

        raw.into_iter()
            .map(|(key, entry)| {
                let name = key.to_uppercase();
                if !VARIABLE_NAME.is_match(&name) {
                    return Err(malformed(format!("invalid variable name \"{key}\"")));
                }
                let entry = RawEntry::deserialize(entry)
                    .map_err(|e| malformed(format!("\"{key}\": {e}")))?;
                let (value, preserve) = match entry {
                    RawEntry::Plain(value) => (Some(value), false),
                    RawEntry::Detailed { value, preserve } => (value, preserve),
                };
                Ok(EnvironmentVariableEntry {
                    name,
                    value,
                    preserve,
                })
            })
            .collect()
    }
}

impl DeclarationFormat for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn candidate_file_names(&self, environment: &str, default_environment: &str) -> Vec<String> {
        let environment = environment.trim();
        if environment == default_environment {
            vec!["env.json".to_string()]
        } else {
            vec![
                format!("{environment}.env.json"),
                format!("env.{environment}.json"),
            ]
        }
    }

    fn environment_name(&self, file_name: &str, default_environment: &str) -> Option<String> {
        let caps = PREFIXED
            .captures(file_name)
            .or_else(|| INFIXED.captures(file_name))?;
        Some(caps.name("name").map_or(default_environment, |m| m.as_str()).to_string())
    }

    fn to_declaration_text(&self, content: &str, file: &str) -> Result<String> {
        Ok(render_entries(&Self::parse(content, file)?))
    }
}
