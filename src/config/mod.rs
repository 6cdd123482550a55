//! Rig configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `TACHOLOG_CONFIG` environment variable (path to TOML file)
//! 2. `tacholog.toml` in the current working directory
//! 3. Built-in defaults (matching the observed bench configuration)
//!
//! All sections and keys are optional; missing keys fall back to defaults, so
//! a config file only needs to name the values it changes. The loaded config
//! is owned by the caller and passed down — there is no process-wide config
//! state, which keeps independent rigs in one process (tests) from
//! cross-contaminating.

pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::acquisition::device::Gain;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level rig configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub adc: AdcConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// ADC channel and gain selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Input channel index.
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Gain setting selecting the full-scale input voltage range.
    #[serde(default)]
    pub gain: Gain,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            channel: defaults::DEFAULT_CHANNEL,
            gain: Gain::default(),
        }
    }
}

/// Linear voltage → RPM mapping ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_v_min")]
    pub v_min: f64,

    #[serde(default = "default_v_max")]
    pub v_max: f64,

    #[serde(default = "default_rpm_min")]
    pub rpm_min: f64,

    #[serde(default = "default_rpm_max")]
    pub rpm_max: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            v_min: defaults::DEFAULT_V_MIN,
            v_max: defaults::DEFAULT_V_MAX,
            rpm_min: defaults::DEFAULT_RPM_MIN,
            rpm_max: defaults::DEFAULT_RPM_MAX,
        }
    }
}

/// Loop pacing and buffer sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Pacing period between samples (ms).
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Sliding-window capacity for the live display (samples).
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Width of the speed-summary averaging window (seconds).
    #[serde(default = "default_summary_window_secs")]
    pub summary_window_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_ms: defaults::DEFAULT_SAMPLE_PERIOD_MS,
            window_capacity: defaults::DEFAULT_WINDOW_CAPACITY,
            summary_window_secs: defaults::DEFAULT_SUMMARY_WINDOW_SECS,
        }
    }
}

/// Output directories, base file name, and snapshot cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Base name for the CSV row store and bulk spreadsheet.
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Interval between periodic display snapshots (seconds).
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DEFAULT_DATA_DIR),
            images_dir: PathBuf::from(defaults::DEFAULT_IMAGES_DIR),
            base_name: defaults::DEFAULT_BASE_NAME.to_string(),
            snapshot_interval_secs: defaults::DEFAULT_SNAPSHOT_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration using the standard search order:
    /// 1. `$TACHOLOG_CONFIG` environment variable
    /// 2. `./tacholog.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("TACHOLOG_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from TACHOLOG_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from TACHOLOG_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "TACHOLOG_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("tacholog.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./tacholog.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./tacholog.toml, using defaults");
                }
            }
        }

        info!("No tacholog.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would make the linear maps or the loop degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion.v_max <= self.conversion.v_min {
            return Err(ConfigError::Invalid(format!(
                "conversion.v_max ({}) must exceed conversion.v_min ({})",
                self.conversion.v_max, self.conversion.v_min
            )));
        }
        if self.conversion.rpm_max < self.conversion.rpm_min {
            return Err(ConfigError::Invalid(format!(
                "conversion.rpm_max ({}) must not be below conversion.rpm_min ({})",
                self.conversion.rpm_max, self.conversion.rpm_min
            )));
        }
        if self.sampling.period_ms == 0 {
            return Err(ConfigError::Invalid(
                "sampling.period_ms must be non-zero".to_string(),
            ));
        }
        if self.sampling.window_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sampling.window_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_channel() -> u8 {
    defaults::DEFAULT_CHANNEL
}
fn default_v_min() -> f64 {
    defaults::DEFAULT_V_MIN
}
fn default_v_max() -> f64 {
    defaults::DEFAULT_V_MAX
}
fn default_rpm_min() -> f64 {
    defaults::DEFAULT_RPM_MIN
}
fn default_rpm_max() -> f64 {
    defaults::DEFAULT_RPM_MAX
}
fn default_period_ms() -> u64 {
    defaults::DEFAULT_SAMPLE_PERIOD_MS
}
fn default_window_capacity() -> usize {
    defaults::DEFAULT_WINDOW_CAPACITY
}
fn default_summary_window_secs() -> u64 {
    defaults::DEFAULT_SUMMARY_WINDOW_SECS
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_DATA_DIR)
}
fn default_images_dir() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_IMAGES_DIR)
}
fn default_base_name() -> String {
    defaults::DEFAULT_BASE_NAME.to_string()
}
fn default_snapshot_interval_secs() -> u64 {
    defaults::DEFAULT_SNAPSHOT_INTERVAL_SECS
}
