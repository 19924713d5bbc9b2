//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Shared primitives and utilities for the simulator runtime."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use thiserror::Error;
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_true() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_uptime_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_grid_interval() -> Duration {
    Duration::from_secs(5)
}

/// Structural problems detected while validating an [`AppConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} bounds are invalid: min {min} must be finite and below max {max}")]
    InvalidBounds { name: &'static str, min: f64, max: f64 },
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Primary configuration object for the simulator daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no file was found and built-in defaults apply.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "VWB_CONFIG";

    /// Load configuration from disk, respecting the `VWB_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `VWB_CONFIG` path must exist. Candidates are optional and the
    /// first existing one wins; with none present the defaults are returned.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        let inspected = candidates
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        debug!(%inspected, "no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Write the daily rolling log file under `directory`.
    #[serde(default = "default_true")]
    pub file_enabled: bool,
    #[serde(default = "default_log_format")]
    pub file_format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_enabled: true,
            file_format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

/// Timing and randomness knobs for the background simulators.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_uptime_interval", rename = "uptime_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub uptime_interval: Duration,
    #[serde(default = "default_grid_interval", rename = "grid_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub grid_interval: Duration,
    /// Fixed seed for reproducible grid readings. Entropy is used when unset.
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub grid: GridBounds,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            uptime_interval: default_uptime_interval(),
            grid_interval: default_grid_interval(),
            random_seed: None,
            grid: GridBounds::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uptime_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("uptime_interval_ms"));
        }
        if self.grid_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("grid_interval_ms"));
        }
        self.grid.validate()
    }
}

/// Uniform sampling ranges for simulated grid readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    #[serde(default = "GridBounds::default_frequency_min")]
    pub frequency_min_hz: f64,
    #[serde(default = "GridBounds::default_frequency_max")]
    pub frequency_max_hz: f64,
    #[serde(default = "GridBounds::default_voltage_min")]
    pub voltage_min_v: f64,
    #[serde(default = "GridBounds::default_voltage_max")]
    pub voltage_max_v: f64,
}

impl GridBounds {
    pub const FREQUENCY_MIN_HZ: f64 = 49.2;
    pub const FREQUENCY_MAX_HZ: f64 = 51.8;
    pub const VOLTAGE_MIN_V: f64 = 227.0;
    pub const VOLTAGE_MAX_V: f64 = 230.5;

    fn default_frequency_min() -> f64 {
        Self::FREQUENCY_MIN_HZ
    }

    fn default_frequency_max() -> f64 {
        Self::FREQUENCY_MAX_HZ
    }

    fn default_voltage_min() -> f64 {
        Self::VOLTAGE_MIN_V
    }

    fn default_voltage_max() -> f64 {
        Self::VOLTAGE_MAX_V
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("grid frequency", self.frequency_min_hz, self.frequency_max_hz)?;
        check_range("grid voltage", self.voltage_min_v, self.voltage_max_v)
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            frequency_min_hz: Self::FREQUENCY_MIN_HZ,
            frequency_max_hz: Self::FREQUENCY_MAX_HZ,
            voltage_min_v: Self::VOLTAGE_MIN_V,
            voltage_max_v: Self::VOLTAGE_MAX_V,
        }
    }
}

fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidBounds { name, min, max })
    }
}
