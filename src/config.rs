//! Configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Every sizing parameter the
//! engine consumes is supplied here, never computed.

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::MarginParams;
use crate::error::{ConfigError, Result};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub margin: MarginConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Margin sizing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MarginConfig {
    /// Risk multiplier applied to sigma.
    #[serde(default = "default_k")]
    pub k: f64,
    /// EWMA decay factor, in `[0, 1)`.
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Lower clamp on the margin rate, in basis points.
    #[serde(default = "default_min_bps")]
    pub min_bps: u32,
    /// Upper clamp on the margin rate, in basis points.
    #[serde(default = "default_max_bps")]
    pub max_bps: u32,
    /// Fixed rate used when history is missing or too short.
    #[serde(default = "default_fallback_bps")]
    pub fallback_bps: u32,
    /// Most-recent history points consulted per quote.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_k() -> f64 {
    3.0
}

fn default_lambda() -> f64 {
    0.94
}

const fn default_min_bps() -> u32 {
    500 // 5%
}

const fn default_max_bps() -> u32 {
    2000 // 20%
}

const fn default_fallback_bps() -> u32 {
    1000 // 10%
}

const fn default_history_window() -> usize {
    60
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            lambda: default_lambda(),
            min_bps: default_min_bps(),
            max_bps: default_max_bps(),
            fallback_bps: default_fallback_bps(),
            history_window: default_history_window(),
        }
    }
}

impl From<MarginConfig> for MarginParams {
    fn from(config: MarginConfig) -> Self {
        Self {
            k: config.k,
            min_bps: config.min_bps,
            max_bps: config.max_bps,
            fallback_bps: config.fallback_bps,
            lambda: config.lambda,
            history_window: config.history_window,
        }
    }
}

/// Settlement scanner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Seconds between scan passes.
    #[serde(default = "default_scan_interval")]
    pub interval_secs: u64,
}

const fn default_scan_interval() -> u64 {
    60
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_scan_interval(),
        }
    }
}

/// Lifecycle driver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Extra attempts per ledger action on confirmation failures.
    /// Other error kinds are never retried.
    #[serde(default = "default_confirm_retries")]
    pub confirm_retries: u32,
}

const fn default_confirm_retries() -> u32 {
    2
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            confirm_retries: default_confirm_retries(),
        }
    }
}

/// Simulated collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// RNG seed for the price walk.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// History points seeded per asset at startup.
    #[serde(default = "default_history_points")]
    pub history_points: usize,
    /// Spacing between seeded history points, in seconds.
    #[serde(default = "default_spacing_secs")]
    pub spacing_secs: u64,
    /// Seconds between live price updates.
    #[serde(default = "default_feed_interval")]
    pub feed_interval_secs: u64,
    /// Maximum per-update price move, in basis points.
    #[serde(default = "default_step_bps")]
    pub step_bps: u32,
}

const fn default_seed() -> u64 {
    42
}

const fn default_history_points() -> usize {
    60
}

const fn default_spacing_secs() -> u64 {
    60
}

const fn default_feed_interval() -> u64 {
    15
}

const fn default_step_bps() -> u32 {
    30
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            history_points: default_history_points(),
            spacing_secs: default_spacing_secs(),
            feed_interval_secs: default_feed_interval(),
            step_bps: default_step_bps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.margin.lambda) {
            return Err(ConfigError::InvalidValue {
                field: "margin.lambda",
                reason: format!("must be in [0, 1), got {}", self.margin.lambda),
            }
            .into());
        }
        if self.margin.k <= 0.0 || !self.margin.k.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "margin.k",
                reason: format!("must be a positive finite number, got {}", self.margin.k),
            }
            .into());
        }
        if self.margin.min_bps > self.margin.max_bps {
            return Err(ConfigError::InvalidValue {
                field: "margin.min_bps",
                reason: format!(
                    "must not exceed max_bps ({} > {})",
                    self.margin.min_bps, self.margin.max_bps
                ),
            }
            .into());
        }
        if self.margin.max_bps > 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "margin.max_bps",
                reason: format!("must not exceed 10000, got {}", self.margin.max_bps),
            }
            .into());
        }
        if self.scanner.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.interval_secs",
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            margin: MarginConfig::default(),
            scanner: ScannerConfig::default(),
            lifecycle: LifecycleConfig::default(),
            sim: SimConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.margin.k, 3.0);
        assert_eq!(config.margin.lambda, 0.94);
        assert_eq!(config.margin.min_bps, 500);
        assert_eq!(config.margin.max_bps, 2000);
        assert_eq!(config.margin.fallback_bps, 1000);
        assert_eq!(config.margin.history_window, 60);
        assert_eq!(config.scanner.interval_secs, 60);
    }

    #[test]
    fn validate_rejects_bad_lambda() {
        let mut config = Config::default();
        config.margin.lambda = 1.0;
        assert!(config.validate().is_err());
        config.margin.lambda = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_clamp() {
        let mut config = Config::default();
        config.margin.min_bps = 3000;
        assert!(config.validate().is_err());
    }
}
