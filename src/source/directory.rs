use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use super::{LoadOptions, SourceProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::formats::{self, DeclarationFormat};

/// A declaration file found by [`DirectoryProvider::environments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentFile {
    pub environment: String,
    /// Name of the format that claimed the file.
    pub format: &'static str,
    pub path: PathBuf,
}

/// Reads declaration files from a directory tree.
///
/// Formats are tried in order; within a format, its candidate file names are
/// tried in order. The first existing file wins.
pub struct DirectoryProvider {
    formats: Vec<Box<dyn DeclarationFormat>>,
    default_environment: String,
}

impl DirectoryProvider {
    pub fn new(
        formats: Vec<Box<dyn DeclarationFormat>>,
        default_environment: impl Into<String>,
    ) -> Self {
        Self {
            formats,
            default_environment: default_environment.into(),
        }
    }

    /// Formats and default environment from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            formats::from_names(&config.loader.formats),
            config.settings.default_environment.clone(),
        )
    }

    pub fn default_environment(&self) -> &str {
        &self.default_environment
    }

    /// Every declaration file under `dir`, sorted by environment then path.
    pub fn environments(&self, dir: &Path, recursive: bool) -> Result<Vec<EnvironmentFile>> {
        let mut found = Vec::new();
        self.collect(dir, recursive, &mut found)?;
        found.sort_by(|a, b| (&a.environment, &a.path).cmp(&(&b.environment, &b.path)));
        Ok(found)
    }

    fn collect(&self, dir: &Path, recursive: bool, found: &mut Vec<EnvironmentFile>) -> Result<()> {
        for entry in read_dir(dir)? {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if recursive {
                    self.collect(&path, recursive, found)?;
                }
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let claimed = self.formats.iter().find_map(|format| {
                format
                    .environment_name(&file_name, &self.default_environment)
                    .map(|environment| (environment, format.name()))
            });
            if let Some((environment, format)) = claimed {
                found.push(EnvironmentFile {
                    environment,
                    format,
                    path,
                });
            }
        }
        Ok(())
    }

    fn search(&self, name: &str, dir: &Path, recursive: bool) -> Result<Option<String>> {
        for format in &self.formats {
            for file_name in format.candidate_file_names(name, &self.default_environment) {
                let path = dir.join(&file_name);
                if !path.is_file() {
                    trace!("no {} at {}", format.name(), path.display());
                    continue;
                }
                debug!("loading \"{name}\" from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
                let text = format.to_declaration_text(&content, &path.display().to_string())?;
                return Ok(Some(text));
            }
        }

        if !recursive {
            return Ok(None);
        }
        let mut subdirs: Vec<PathBuf> = read_dir(dir)?
            .into_iter()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| entry.path())
            .collect();
        subdirs.sort();
        for subdir in subdirs {
            if let Some(text) = self.search(name, &subdir, true)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

impl SourceProvider for DirectoryProvider {
    fn provide(&self, name: &str, options: &LoadOptions) -> Result<String> {
        self.search(name, &options.dir, options.recursive)?
            .ok_or_else(|| Error::SourceNotFound {
                name: name.to_string(),
            })
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    let io = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(io)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider() -> DirectoryProvider {
        DirectoryProvider::new(formats::builtin(), "default")
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir.join(name).parent().unwrap()).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn options(dir: &TempDir, recursive: bool) -> LoadOptions {
        LoadOptions {
            dir: dir.path().to_path_buf(),
            recursive,
        }
    }

    #[test]
    fn default_environment_reads_dot_env() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".env", "A=1\n");
        let text = provider().provide("default", &options(&dir, false)).unwrap();
        assert_eq!(text, "A=1\n");
    }

    #[test]
    fn classic_wins_over_json() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev.env.json", r#"{"A": "json"}"#);
        write(dir.path(), "dev.env", "A=classic\n");
        let text = provider().provide("dev", &options(&dir, false)).unwrap();
        assert_eq!(text, "A=classic\n");
    }

    #[test]
    fn json_files_become_declaration_text() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "env.dev.json", r#"{"a": {"value": "x", "preserve": true}}"#);
        let text = provider().provide("dev", &options(&dir, false)).unwrap();
        assert_eq!(text, "#/preserve\nA=\"x\"\n");
    }

    #[test]
    fn recursive_search_descends_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b/.env.dev", "FROM=b\n");
        write(dir.path(), "a/nested/.env.dev", "FROM=a\n");

        let err = provider().provide("dev", &options(&dir, false)).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));

        let text = provider().provide("dev", &options(&dir, true)).unwrap();
        assert_eq!(text, "FROM=a\n");
    }

    #[test]
    fn malformed_json_propagates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "env.json", "{");
        let err = provider().provide("default", &options(&dir, false)).unwrap_err();
        assert!(matches!(err, Error::MalformedDeclarationFile { .. }));
    }

    #[test]
    fn lists_environments() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".env", "");
        write(dir.path(), "prod.env", "");
        write(dir.path(), "env.test.json", "{}");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), "sub/.env.deep", "");

        let flat = provider().environments(dir.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|f| (f.environment.as_str(), f.format))
            .collect();
        assert_eq!(
            names,
            [("default", "classic"), ("prod", "classic"), ("test", "json")]
        );

        let deep = provider().environments(dir.path(), true).unwrap();
        assert!(deep.iter().any(|f| f.environment == "deep"));
    }
}
