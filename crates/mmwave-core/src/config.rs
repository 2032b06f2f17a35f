//! # Configuration
//!
//! YAML configuration for beam management runs:
//!
//! - Logging (level, format, filters)
//! - Numerology (sub-carrier spacing and PHY/MAC timing parameters)
//! - Beam sweeping (tx/rx codebook files and sweep intervals)
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `MMWAVE_CONFIG` environment variable
//! 2. `./mmwave.yaml` (current directory)
//! 3. `~/.config/mmwave/config.yaml` (user config)
//! 4. `/etc/mmwave/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! logging:
//!   level: debug
//!   format: json
//!
//! numerology:
//!   sub_carrier_spacing: 240khz
//!   num_harq_process: 16
//!
//! beam_sweep:
//!   tx_codebook: codebooks/KronCodebook16h4v.txt
//!   rx_codebook: codebooks/KronCodebook8h2v.txt
//!   tx_interval_us: 62.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::numerology::{NumerologyConfig, NumerologyParams};
use crate::observe::LogConfig;
use crate::timing::micros_f64;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MMWAVE_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

/// Beam sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSweepConfig {
    /// Codebook swept by the transmitting node
    pub tx_codebook: PathBuf,
    /// Codebook swept by the receiving node
    pub rx_codebook: PathBuf,
    /// Minimum time between tx beam changes, in microseconds
    pub tx_interval_us: f64,
    /// Nominal rx beam change interval, in microseconds
    pub rx_interval_us: f64,
}

impl Default for BeamSweepConfig {
    fn default() -> Self {
        Self {
            tx_codebook: PathBuf::from("codebooks/KronCodebook16h4v.txt"),
            rx_codebook: PathBuf::from("codebooks/KronCodebook8h2v.txt"),
            tx_interval_us: 125.0, // one 120 kHz slot
            rx_interval_us: 125.0,
        }
    }
}

impl BeamSweepConfig {
    pub fn tx_interval(&self) -> Duration {
        micros_f64(self.tx_interval_us)
    }

    pub fn rx_interval(&self) -> Duration {
        micros_f64(self.rx_interval_us)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmWaveConfig {
    pub logging: LogConfig,
    pub numerology: NumerologyParams,
    pub beam_sweep: BeamSweepConfig,
}

impl MmWaveConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{CONFIG_ENV_VAR} points to {}",
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configuration search paths, in priority order after the env var.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./mmwave.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "mmwave") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/mmwave/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.numerology
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let sweep = &self.beam_sweep;
        for (name, value) in [
            ("tx_interval_us", sweep.tx_interval_us),
            ("rx_interval_us", sweep.rx_interval_us),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if sweep.tx_codebook.as_os_str().is_empty() || sweep.rx_codebook.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "codebook paths must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated numerology built from the `numerology` section.
    pub fn numerology(&self) -> Result<NumerologyConfig, ConfigError> {
        NumerologyConfig::from_params(self.numerology.clone())
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Example configuration YAML with every field spelled out.
    pub fn example_yaml() -> String {
        serde_yaml::to_string(&Self::default()).unwrap_or_default()
    }
}
