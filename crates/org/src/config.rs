use episode_org_core::{NamingRules, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reserved name of the per-series config file.
pub const CONFIG_FILENAME: &str = "0org";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub naming: NamingRules,
    pub digest: DigestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub chunk_size: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILENAME)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A missing `0org`, or one this tool cannot parse, means defaults.
    /// Only a file that exists but cannot be read is an error.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        match Self::load(&path) {
            Err(ConfigError::Parse { path, source }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "ignoring unrecognised config, using defaults"
                );
                Ok(Self::default())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();

        assert_eq!(config.naming.default_digits, 2);
        assert_eq!(config.naming.subtitle_extensions, vec!["ass", "ssa", "sub"]);
        assert_eq!(config.digest.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            Config::path_in(dir.path()),
            r#"{ "naming": { "default_digits": 3 } }"#,
        )
        .unwrap();

        let config = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config.naming.default_digits, 3);
        assert_eq!(config.naming.subtitle_extensions.len(), 3);
    }

    #[test]
    fn serialized_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = Config::path_in(dir.path());

        let mut config = Config::default();
        config.naming.subtitle_extensions.push("srt".to_string());
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn unparseable_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Config::path_in(dir.path());
        std::fs::write(&path, "naming: yaml-or-ruby\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert_eq!(Config::load_or_default(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(Config::path_in(dir.path())).unwrap();

        assert!(matches!(
            Config::load_or_default(dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }
}
