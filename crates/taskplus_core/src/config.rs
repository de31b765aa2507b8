//! Core configuration file.
//!
//! # Responsibility
//! - Describe where the database and log files live.
//! - Load and save the JSON config consumed by front ends.
//!
//! # Invariants
//! - Paths held by a loaded `CoreConfig` are absolute.
//! - Relative paths in a config file resolve against the file's directory.

use crate::logging::{default_log_level, LogLevel};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "taskplus.sqlite3";
const LOG_DIR_NAME: &str = "logs";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "config io error: {err}"),
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Persisted core settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory holding the database file. Defaults to the config file's
    /// directory.
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    /// `trace|debug|info|warn|error`; build-mode default when absent.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Log directory; `<data_dir>/logs` when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

impl CoreConfig {
    /// Defaults rooted at `data_dir`, without touching the filesystem.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        Ok(Self {
            data_dir: absolutize(data_dir.as_ref())?,
            db_file_name: default_db_file_name(),
            log_level: None,
            log_dir: None,
        })
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = absolutize(path.as_ref())?;
        let content = fs::read_to_string(&path)?;
        let mut config: Self = serde_json::from_str(&content)?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.data_dir = if config.data_dir.as_os_str().is_empty() {
            base.clone()
        } else {
            base.join(&config.data_dir)
        };
        config.log_dir = config.log_dir.map(|dir| base.join(dir));
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_DIR_NAME))
    }

    /// Configured log level, or the build-mode default.
    pub fn log_level(&self) -> ConfigResult<LogLevel> {
        match &self.log_level {
            Some(raw) => raw.parse().map_err(ConfigError::Invalid),
            None => Ok(default_log_level()),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        let name = self.db_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "db_file_name must be a bare file name, got `{}`",
                self.db_file_name
            )));
        }
        self.log_level()?;
        Ok(())
    }
}

fn absolutize(path: &Path) -> ConfigResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("path cannot be empty".to_string()));
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_DB_FILE_NAME};
    use crate::logging::LogLevel;
    use std::fs;

    #[test]
    fn for_data_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::for_data_dir(dir.path()).unwrap();
        assert_eq!(config.db_path(), dir.path().join(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_dir(), dir.path().join("logs"));
        assert!(config.log_level().is_ok());
    }

    #[test]
    fn load_resolves_relative_paths_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskplus.json");
        fs::write(
            &path,
            r#"{"data_dir":"data","log_level":"WARN","log_dir":"diag"}"#,
        )
        .unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, dir.path().join("data"));
        assert_eq!(config.db_path(), dir.path().join("data").join(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_dir(), dir.path().join("diag"));
        assert_eq!(config.log_level().unwrap(), LogLevel::Warn);
    }

    #[test]
    fn load_defaults_data_dir_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskplus.json");
        fs::write(&path, "{}").unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn load_rejects_bad_level_and_db_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskplus.json");

        fs::write(&path, r#"{"log_level":"loud"}"#).unwrap();
        assert!(matches!(
            CoreConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, r#"{"db_file_name":"nested/db.sqlite3"}"#).unwrap();
        assert!(matches!(
            CoreConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(CoreConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskplus.json");
        let mut config = CoreConfig::for_data_dir(dir.path().join("data")).unwrap();
        config.log_level = Some("error".to_string());

        config.save(&path).unwrap();
        let loaded = CoreConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
