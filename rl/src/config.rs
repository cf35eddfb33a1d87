//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::limiter::RateLimiterConfig;

const LOCAL_CONFIG_FILE: &str = ".ratelimiter.yml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pacing for the rate limiter
    pub limiter: RateLimiterConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.limiter.validate().context("Invalid limiter configuration")
    }

    /// Load configuration: explicit path, else the first readable search path, else defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => {
                Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))
            }
            None => Ok(Self::load_from_candidates(&Self::search_paths())),
        }
    }

    /// `.ratelimiter.yml` in the working directory, then the user config file
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        paths.extend(Self::user_config_path());
        paths
    }

    fn load_from_candidates(candidates: &[PathBuf]) -> Self {
        for candidate in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %candidate.display(), error = %e, "Config::load: skipping config"),
            }
        }
        tracing::info!("Config::load: no config file found, using defaults");
        Self::default()
    }

    /// Read just the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ratelimiter").join("ratelimiter.yml"))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limiter, RateLimiterConfig::default());
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: debug").unwrap();
        writeln!(file, "limiter:").unwrap();
        writeln!(file, "  min-interval-ms: 2000").unwrap();
        writeln!(file, "  ratio: 5").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.limiter.min_interval_ms, 2000);
        assert_eq!(config.limiter.ratio, 5);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "limiter:").unwrap();
        writeln!(file, "  min-interval-ms: 250").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.limiter.min_interval_ms, 250);
        assert_eq!(config.limiter.ratio, 3);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_search_paths_start_with_local_file() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from(".ratelimiter.yml"));
        if let Some(user_config) = Config::user_config_path() {
            assert_eq!(paths.last(), Some(&user_config));
        }
    }

    #[test]
    fn test_candidates_skip_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let broken = dir.path().join("broken.yml");
        let valid = dir.path().join("valid.yml");
        std::fs::write(&broken, "limiter: [not, a, map]\n").unwrap();
        std::fs::write(&valid, "limiter:\n  ratio: 7\n").unwrap();

        let config = Config::load_from_candidates(&[missing.clone(), broken, valid]);
        assert_eq!(config.limiter.ratio, 7);

        let config = Config::load_from_candidates(&[missing]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "limiter: [not, a, map]").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let config = Config {
            limiter: RateLimiterConfig {
                min_interval_ms: 0,
                ratio: 3,
            },
            log_level: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_keys() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("min-interval-ms: 1000"));
        assert!(yaml.contains("ratio: 3"));
        assert!(!yaml.contains("log-level"));
    }
}
