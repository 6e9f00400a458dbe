//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and merging
//! configurations with proper precedence rules.

use crate::error::CalcError;
use crate::types::{MAX_BATCH_SIZE, MAX_CAPACITY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Admission capacity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Number of random requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Fixed RNG seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_operand: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_operand: Option<i64>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Colored output by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,

    /// Print a batch summary by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<bool>,

    /// Pretty-print JSON by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_pretty: Option<bool>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, CalcError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CalcError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CalcError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| CalcError::config(format!("Failed to parse TOML configuration: {}", e)))?;

        self.validate_config(&config)?;

        if self.verbose {
            tracing::info!(path = %path.display(), "loaded config file");
        }

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config (lowest), then `~/.batch-calc.toml`, then the current
    /// directory (highest). Missing files are skipped; a file that exists
    /// but fails to load is logged and skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, CalcError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping config file");
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "merged config file");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./batch-calc.toml", "./.batch-calc.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path in the home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".batch-calc.toml", "batch-calc.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    ///
    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("batch-calc").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.count.is_some() {
                        lower_defaults.count = higher_defaults.count;
                    }
                    if higher_defaults.seed.is_some() {
                        lower_defaults.seed = higher_defaults.seed;
                    }
                    if higher_defaults.min_operand.is_some() {
                        lower_defaults.min_operand = higher_defaults.min_operand;
                    }
                    if higher_defaults.max_operand.is_some() {
                        lower_defaults.max_operand = higher_defaults.max_operand;
                    }
                    Some(lower_defaults)
                }
                (None, Some(higher_defaults)) => Some(higher_defaults),
                (Some(lower_defaults), None) => Some(lower_defaults),
                (None, None) => None,
            },
            output: match (lower.output, higher.output) {
                (Some(mut lower_output), Some(higher_output)) => {
                    if higher_output.pretty.is_some() {
                        lower_output.pretty = higher_output.pretty;
                    }
                    if higher_output.summary.is_some() {
                        lower_output.summary = higher_output.summary;
                    }
                    if higher_output.json_pretty.is_some() {
                        lower_output.json_pretty = higher_output.json_pretty;
                    }
                    Some(lower_output)
                }
                (None, Some(higher_output)) => Some(higher_output),
                (Some(lower_output), None) => Some(lower_output),
                (None, None) => None,
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), CalcError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(concurrency) = defaults.concurrency {
            if concurrency == 0 || concurrency > MAX_CAPACITY {
                return Err(CalcError::config(format!(
                    "Concurrency must be between 1 and {}",
                    MAX_CAPACITY
                )));
            }
        }

        if let Some(count) = defaults.count {
            if count > MAX_BATCH_SIZE {
                return Err(CalcError::config(format!(
                    "Count must not exceed {}",
                    MAX_BATCH_SIZE
                )));
            }
        }

        if let (Some(min), Some(max)) = (defaults.min_operand, defaults.max_operand) {
            if min > max {
                return Err(CalcError::config(format!(
                    "min_operand ({}) must not exceed max_operand ({})",
                    min, max
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
concurrency = 3
count = 12
seed = 42
min_operand = -10
max_operand = 10

[output]
summary = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(3));
        assert_eq!(defaults.count, Some(12));
        assert_eq!(defaults.seed, Some(42));
        assert_eq!(defaults.min_operand, Some(-10));
        assert_eq!(defaults.max_operand, Some(10));
        assert_eq!(config.output.unwrap().summary, Some(true));
    }

    #[test]
    fn test_invalid_concurrency() {
        let temp_file = write_config("[defaults]\nconcurrency = 0\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(CalcError::ConfigError { .. })));
    }

    #[test]
    fn test_invalid_operand_range() {
        let temp_file = write_config("[defaults]\nmin_operand = 5\nmax_operand = 1\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_file = write_config("[defaults\nconcurrency = ");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(CalcError::ConfigError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new(false).load_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(CalcError::FileError { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(10),
                count: Some(40),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                pretty: Some(false),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(2),
                seed: Some(9),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                pretty: Some(true),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(2)); // Higher wins
        assert_eq!(defaults.count, Some(40)); // Lower preserved
        assert_eq!(defaults.seed, Some(9));
        assert_eq!(merged.output.unwrap().pretty, Some(true));
    }
}
