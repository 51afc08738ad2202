//! Configuration for the position log pipeline.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::info;
use serde::Deserialize;
use thiserror::Error;

/// Calendar format of the `begin` field.
pub const BEGIN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Location of the bundled config, relative to the project root.
const DEFAULT_CONFIG_FILE: &str = "config/default.yaml";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid begin '{value}', expected YYYY-MM-DD HH:MM:SS: {source}")]
    InvalidBegin {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid freq {0}: must be a finite, non-negative number")]
    InvalidFreq(f64),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fields as they appear in the YAML file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    begin: String,
    freq: f64,
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatConfig {
    /// Calendar time assigned to the first sample.
    pub begin: NaiveDateTime,

    /// Output sampling frequency in Hz; 0 disables resampling.
    pub freq: f64,
}

impl FormatConfig {
    /// Build a config, rejecting negative or non-finite frequencies.
    pub fn new(begin: NaiveDateTime, freq: f64) -> Result<Self> {
        if !freq.is_finite() || freq < 0.0 {
            return Err(ConfigError::InvalidFreq(freq));
        }
        Ok(Self { begin, freq })
    }

    /// Parse a config from YAML text.
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Yaml {
            path: origin.to_string(),
            source: e,
        })?;

        let begin = NaiveDateTime::parse_from_str(raw.begin.trim(), BEGIN_FORMAT).map_err(|e| {
            ConfigError::InvalidBegin {
                value: raw.begin.clone(),
                source: e,
            }
        })?;

        Self::new(begin, raw.freq)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml_str(&content, &path.display().to_string())?;

        info!(
            "{} has been loaded",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        Ok(config)
    }

    /// Load from `path`, or from the bundled default config when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_yaml(p),
            None => Self::from_yaml(default_config_path()),
        }
    }

    /// Whether the series is resampled before rebasing.
    #[inline]
    pub fn resampling(&self) -> bool {
        self.freq > 0.0
    }

    /// Resampling step in seconds. Only meaningful when `resampling()` holds.
    #[inline]
    pub fn step(&self) -> f64 {
        1.0 / self.freq
    }
}

/// Root directory of the project (holds `config/` and `formatted/`).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Path of the bundled default config file.
pub fn default_config_path() -> PathBuf {
    project_root().join(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn begin() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2021-04-01 12:00:00", BEGIN_FORMAT).unwrap()
    }

    #[test]
    fn test_from_yaml_str() {
        let config = FormatConfig::from_yaml_str("begin: \"2021-04-01 12:00:00\"\nfreq: 2.5\n", "inline")
            .unwrap();
        assert_eq!(config.begin, begin());
        assert_eq!(config.freq, 2.5);
        assert!(config.resampling());
        assert!((config.step() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_integer_freq_and_extra_keys() {
        let yaml = "begin: 2021-04-01 12:00:00\nfreq: 0\nnote: ignored\n";
        let config = FormatConfig::from_yaml_str(yaml, "inline").unwrap();
        assert_eq!(config.freq, 0.0);
        assert!(!config.resampling());
    }

    #[test]
    fn test_missing_field() {
        let result = FormatConfig::from_yaml_str("begin: \"2021-04-01 12:00:00\"\n", "inline");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_malformed_begin() {
        let result = FormatConfig::from_yaml_str("begin: \"01/04/2021\"\nfreq: 1\n", "inline");
        match result {
            Err(ConfigError::InvalidBegin { value, .. }) => assert_eq!(value, "01/04/2021"),
            other => panic!("Expected InvalidBegin, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_freq() {
        let result = FormatConfig::from_yaml_str("begin: \"2021-04-01 12:00:00\"\nfreq: -1\n", "inline");
        assert!(matches!(result, Err(ConfigError::InvalidFreq(_))));
        assert!(FormatConfig::new(begin(), f64::NAN).is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "begin: \"2021-04-01 12:00:00\"").unwrap();
        writeln!(file, "freq: 10").unwrap();
        file.flush().unwrap();

        let config = FormatConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.freq, 10.0);
    }

    #[test]
    fn test_missing_file() {
        let result = FormatConfig::from_yaml("/nonexistent/poslog/config.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_default_config_loads() {
        let config = FormatConfig::load(None).unwrap();
        assert_eq!(config.freq, 0.0);
    }
}
