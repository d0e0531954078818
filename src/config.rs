//! TOML configuration for loginwatch.
//!
//! Layered lookup: an explicit path, then the `LOGINWATCH_CONFIG`
//! environment variable, then `/etc/loginwatch/loginwatch.toml`, then the
//! compiled-in defaults. Every section is optional.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "LOGINWATCH_CONFIG";

const SYSTEM_CONFIG_PATH: &str = "/etc/loginwatch/loginwatch.toml";

/// Longest accepted gap between simulator bursts (one day).
pub const MAX_BURST_INTERVAL_SEC: u64 = 86_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("detector window must be greater than zero")]
    ZeroWindow,
    #[error("at least one trigger threshold is required")]
    NoThresholds,
    #[error("trigger thresholds must be greater than zero")]
    ZeroThreshold,
    #[error("dashboard recent_capacity must be greater than zero")]
    ZeroCapacity,
    #[error("simulator success_ratio must be within [0, 1], got {0}")]
    SuccessRatio(String),
    #[error("simulator burst_interval_sec must be greater than zero")]
    ZeroBurstInterval,
    #[error("simulator burst_interval_sec must be at most {max}, got {0}", max = MAX_BURST_INTERVAL_SEC)]
    BurstIntervalTooLarge(u64),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the loginwatch process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration.
    ///
    /// An explicit `path` must load; failing that is an error. Otherwise the
    /// environment override and the system location are tried in order, and
    /// unreadable files there only produce a warning.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "LOGINWATCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Reject values the detector or simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detector.window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.detector.thresholds.is_empty() {
            return Err(ConfigError::NoThresholds);
        }
        if self.detector.thresholds.contains(&0) {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.dashboard.recent_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&self.simulator.success_ratio) {
            return Err(ConfigError::SuccessRatio(
                self.simulator.success_ratio.to_string(),
            ));
        }
        if self.simulator.burst_interval_sec == 0 {
            return Err(ConfigError::ZeroBurstInterval);
        }
        if self.simulator.burst_interval_sec > MAX_BURST_INTERVAL_SEC {
            return Err(ConfigError::BurstIntervalTooLarge(
                self.simulator.burst_interval_sec,
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Rolling failure-window parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Width of the rolling window in milliseconds.
    pub window_ms: u64,
    /// Exact attempt counts that fire an anomaly.
    pub thresholds: Vec<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            thresholds: vec![5, 8],
        }
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Synthetic login traffic shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Whether `serve` runs the simulator at all.
    pub enabled: bool,
    /// Events in the initial seed burst.
    pub seed_events: usize,
    /// Number of (user, ip) clusters in the seed burst.
    pub seed_clusters: usize,
    /// Leading seed events that are forced failures spread over the clusters.
    pub seed_cluster_fails: usize,
    /// Seconds between periodic bursts.
    pub burst_interval_sec: u64,
    /// Events per periodic burst.
    pub burst_events: usize,
    /// Leading burst events that are forced failures alternating over two clusters.
    pub burst_cluster_fails: usize,
    /// Probability that a free-running event is a success.
    pub success_ratio: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed_events: 100,
            seed_clusters: 4,
            seed_cluster_fails: 40,
            burst_interval_sec: 60,
            burst_events: 20,
            burst_cluster_fails: 10,
            success_ratio: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard / API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Length of the recent events / anomalies / decisions lists.
    pub recent_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_capacity: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP API binds to.
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit newline-delimited JSON instead of the human formatter.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();

        assert_eq!(cfg.detector.window_ms, 60_000);
        assert_eq!(cfg.detector.thresholds, vec![5, 8]);

        assert!(cfg.simulator.enabled);
        assert_eq!(cfg.simulator.seed_events, 100);
        assert_eq!(cfg.simulator.seed_clusters, 4);
        assert_eq!(cfg.simulator.seed_cluster_fails, 40);
        assert_eq!(cfg.simulator.burst_interval_sec, 60);
        assert_eq!(cfg.simulator.burst_events, 20);
        assert_eq!(cfg.simulator.burst_cluster_fails, 10);

        assert_eq!(cfg.dashboard.recent_capacity, 10);
        assert_eq!(cfg.api.bind, "127.0.0.1:8080");
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);

        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[detector]
thresholds = [3, 6, 9]

[api]
bind = "0.0.0.0:9000"
"#;

        let cfg: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.detector.thresholds, vec![3, 6, 9]);
        assert_eq!(cfg.api.bind, "0.0.0.0:9000");

        assert_eq!(cfg.detector.window_ms, 60_000);
        assert_eq!(cfg.simulator.burst_events, 20);
        assert_eq!(cfg.dashboard.recent_capacity, 10);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        let defaults = Config::default();

        assert_eq!(cfg.detector.window_ms, defaults.detector.window_ms);
        assert_eq!(cfg.simulator.seed_events, defaults.simulator.seed_events);
        assert_eq!(cfg.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.detector.window_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWindow));

        let mut cfg = Config::default();
        cfg.detector.thresholds.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoThresholds));

        let mut cfg = Config::default();
        cfg.detector.thresholds = vec![0, 5];
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroThreshold));

        let mut cfg = Config::default();
        cfg.dashboard.recent_capacity = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCapacity));

        let mut cfg = Config::default();
        cfg.simulator.success_ratio = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::SuccessRatio(_))));

        let mut cfg = Config::default();
        cfg.simulator.burst_interval_sec = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBurstInterval));
    }

    #[test]
    fn test_validate_bounds_burst_interval() {
        let mut cfg = Config::default();
        cfg.simulator.burst_interval_sec = MAX_BURST_INTERVAL_SEC;
        assert_eq!(cfg.validate(), Ok(()));

        cfg.simulator.burst_interval_sec = MAX_BURST_INTERVAL_SEC + 1;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BurstIntervalTooLarge(MAX_BURST_INTERVAL_SEC + 1))
        );

        cfg.simulator.burst_interval_sec = u64::MAX;
        assert_eq!(cfg.validate(), Err(ConfigError::BurstIntervalTooLarge(u64::MAX)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loginwatch.toml");
        std::fs::write(
            &path,
            "[detector]\nwindow_ms = 30000\n\n[logging]\nlevel = \"debug\"\njson = true\n",
        )
        .unwrap();

        let cfg = Config::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.detector.window_ms, 30_000);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_explicit_path_that_fails_validation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[detector]\nthresholds = []\n").unwrap();

        assert!(Config::resolve(Some(&path)).is_err());
    }
}
