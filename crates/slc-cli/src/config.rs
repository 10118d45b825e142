//! `largo.toml`-style project configuration (`spec.md` §6 lists the CLI as
//! an out-of-scope collaborator; this is the minimal settings surface a
//! real driver for these two cores would carry, grounded on the teacher's
//! own `Largo.toml`/`Manifest` handling).
//!
//! Absence of a config file is not an error: callers fall back to whatever
//! was passed on the command line.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The `[project]` table of a `largo.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: Project,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Source files to parse when none are given on the command line.
    #[serde(default)]
    pub source: Vec<String>,
    /// Whether `slc parse` should also build and print an export trie for
    /// any top-level `export` declarations it finds.
    #[serde(default)]
    pub emit_trie: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::path::PathBuf, std::io::Error),
    Parse(std::path::PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "failed to read {}: {e}", path.display()),
            ConfigError::Parse(path, e) => write!(f, "failed to parse {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ProjectConfig {
    /// Looks for `largo.toml` in `dir`. Returns `Ok(None)` when it's
    /// missing — that's the expected case, not a failure.
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join("largo.toml");
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::Parse(path, e))?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn parses_the_project_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("largo.toml"), "[project]\nsource = [\"src/main.slc\"]\nemit_trie = true\n")
            .unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.project.source, vec!["src/main.slc".to_string()]);
        assert!(config.project.emit_trie);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("largo.toml"), "not valid toml = [").unwrap();
        assert!(matches!(ProjectConfig::load(dir.path()), Err(ConfigError::Parse(..))));
    }
}
