//! Persisted client settings.
//!
//! Settings live in a TOML file under the platform config directory and are
//! read into an immutable [`Config`] value at request-build time. The core
//! never mutates them mid-turn; the settings screen (outside the core) saves a
//! whole new file via [`Config::save_to_path`].

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

fn default_model() -> String {
    "zhipuai".to_string()
}

fn default_search_engine() -> String {
    "search_std".to_string()
}

fn default_result_count() -> u32 {
    10
}

fn default_time_range() -> String {
    "month".to_string()
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_safesearch() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearxngOptions {
    /// Comma-separated engine allow-list; empty means the server default.
    #[serde(default)]
    pub engines: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_safesearch")]
    pub safesearch: u8,
    /// Overrides the generic time range when set.
    #[serde(default)]
    pub time_range: Option<String>,
}

impl Default for SearxngOptions {
    fn default() -> Self {
        Self {
            engines: String::new(),
            language: default_language(),
            safesearch: default_safesearch(),
            time_range: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BochaaiOptions {
    /// Overrides the generic time range when set, already in Bocha AI's
    /// freshness vocabulary (oneDay, oneWeek, ...).
    #[serde(default)]
    pub time_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_search_engine")]
    pub default_search_engine: String,
    #[serde(default = "default_result_count")]
    pub result_count: u32,
    #[serde(default = "default_time_range")]
    pub time_range: String,
    #[serde(default)]
    pub searxng: SearxngOptions,
    #[serde(default)]
    pub bochaai: BochaaiOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_search_engine: default_search_engine(),
            result_count: default_result_count(),
            time_range: default_time_range(),
            searxng: SearxngOptions::default(),
            bochaai: BochaaiOptions::default(),
        }
    }
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } | ConfigError::Write { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "permacommons", "seekchat")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save atomically: write to a temp file in the target directory, then
    /// persist over the destination.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(write_err)?;

        let serialized = toml::to_string_pretty(self).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::other(source),
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
        temp.write_all(serialized.as_bytes()).map_err(write_err)?;
        temp.persist(path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}
