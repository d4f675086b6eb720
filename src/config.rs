use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Settings {
    /// Environment compiled when none is named.
    #[serde(default)]
    pub default_environment: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoaderConfig {
    /// Directory searched for declaration files. Tilde-expanded.
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub recursive: bool,
    /// Declaration format names, in lookup precedence order.
    #[serde(default)]
    pub formats: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub no_progress_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default)]
    pub level: String,
    /// Log file, appended to. Empty disables file logging.
    #[serde(default)]
    pub file: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    loader: LoaderOverlay,
    #[serde(default)]
    tokenizer: TokenizerOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    default_environment: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoaderOverlay {
    dir: Option<String>,
    recursive: Option<bool>,
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    formats: Vec<String>,
    #[serde(default)]
    remove_formats: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenizerOverlay {
    no_progress_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
    file: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Tilde- and variable-expand a configured path, falling back to the raw text.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            warn!("cannot expand path \"{path}\": {e}");
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/zenv/config.toml (if exists)
    ///
    /// User config merges with defaults: lists extend, scalars override.
    /// Set `replace = true` in `[loader]` to replace the format list entirely.
    /// Use `remove_formats` to subtract specific formats from the defaults.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Try to load user overlay from ~/.config/zenv/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let path = expand_path("~/.config/zenv/config.toml");
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.settings.default_environment {
            self.settings.default_environment = v;
        }

        let l = overlay.loader;
        if let Some(v) = l.dir {
            self.loader.dir = v;
        }
        if let Some(v) = l.recursive {
            self.loader.recursive = v;
        }
        merge_list(
            &mut self.loader.formats,
            l.formats,
            &l.remove_formats,
            l.replace,
        );

        if let Some(v) = overlay.tokenizer.no_progress_limit {
            self.tokenizer.no_progress_limit = v;
        }

        if let Some(v) = overlay.logging.level {
            self.logging.level = v;
        }
        if let Some(v) = overlay.logging.file {
            self.logging.file = v;
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert_eq!(config.settings.default_environment, "default");
        assert_eq!(config.loader.dir, ".");
        assert!(!config.loader.recursive);
        assert_eq!(config.loader.formats, vec!["classic", "json"]);
        assert_eq!(config.tokenizer.no_progress_limit, 20);
        assert_eq!(config.logging.level, "warn");
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_overrides_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            default_environment = "local"

            [loader]
            dir = "~/envs"
            recursive = true
        "#,
        );
        assert_eq!(config.settings.default_environment, "local");
        assert_eq!(config.loader.dir, "~/envs");
        assert!(config.loader.recursive);
    }

    #[test]
    fn overlay_extends_and_removes_formats() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [loader]
            remove_formats = ["classic"]
            formats = ["json", "classic"]
        "#,
        );
        assert_eq!(config.loader.formats, vec!["json", "classic"]);
    }

    #[test]
    fn overlay_replace_formats() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [loader]
            replace = true
            formats = ["json"]
        "#,
        );
        assert_eq!(config.loader.formats, vec!["json"]);
    }

    #[test]
    fn overlay_omitted_settings_unchanged() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [logging]
            level = "debug"
        "#,
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.tokenizer.no_progress_limit, 20);
        assert_eq!(config.loader.formats, vec!["classic", "json"]);
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let original = Config::default_config();
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(config.loader.formats, original.loader.formats);
        assert_eq!(config.logging.file, original.logging.file);
    }

    #[test]
    fn expand_path_handles_plain_paths() {
        assert_eq!(expand_path("./envs"), PathBuf::from("./envs"));
    }
}
