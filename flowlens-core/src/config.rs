//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/flowlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/flowlens/` (~/.config/flowlens/)
//! - Data: `$XDG_DATA_HOME/flowlens/` (~/.local/share/flowlens/)
//! - State/Logs: `$XDG_STATE_HOME/flowlens/` (~/.local/state/flowlens/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Action recorder configuration
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Session and pattern analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Action recorder configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecorderConfig {
    /// Enable/disable action recording.
    ///
    /// The `FLOWLENS_RECORDING_DISABLED` environment variable overrides this
    /// at recorder startup (see [`crate::recorder`]).
    #[serde(default = "default_recorder_enabled")]
    pub enabled: bool,

    /// Capacity of the bounded record queue; when full, the newest record
    /// is dropped rather than blocking the caller
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Byte cap applied to every string inside a record payload
    #[serde(default = "default_payload_cap")]
    pub payload_cap_bytes: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: default_recorder_enabled(),
            queue_capacity: default_queue_capacity(),
            payload_cap_bytes: default_payload_cap(),
        }
    }
}

fn default_recorder_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_payload_cap() -> usize {
    2048
}

/// Session reconstruction and mining configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Inactivity gap in seconds that starts a new session
    #[serde(default = "default_session_gap")]
    pub session_gap_secs: u64,

    /// Intra-session gap in seconds flagged as idle time
    #[serde(default = "default_idle_gap")]
    pub idle_gap_secs: u64,

    /// Repetitions of the same action within a session counted as rework
    #[serde(default = "default_rework_threshold")]
    pub rework_threshold: usize,

    /// A session longer than the baseline median by this multiple is a detour
    #[serde(default = "default_detour_multiplier")]
    pub detour_multiplier: f64,

    /// N-gram lengths mined from session action sequences
    #[serde(default = "default_ngram_lengths")]
    pub ngram_lengths: Vec<usize>,

    /// Number of top patterns included in reports
    #[serde(default = "default_top_patterns")]
    pub top_patterns: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            session_gap_secs: default_session_gap(),
            idle_gap_secs: default_idle_gap(),
            rework_threshold: default_rework_threshold(),
            detour_multiplier: default_detour_multiplier(),
            ngram_lengths: default_ngram_lengths(),
            top_patterns: default_top_patterns(),
        }
    }
}

impl AnalysisConfig {
    /// Validate threshold relationships, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.session_gap_secs == 0 {
            return Err(Error::Config(
                "analysis.session_gap_secs must be greater than 0".to_string(),
            ));
        }
        if self.idle_gap_secs >= self.session_gap_secs {
            return Err(Error::Config(
                "analysis.idle_gap_secs must be shorter than analysis.session_gap_secs"
                    .to_string(),
            ));
        }
        if self.rework_threshold < 2 {
            return Err(Error::Config(
                "analysis.rework_threshold must be at least 2".to_string(),
            ));
        }
        if self.detour_multiplier < 1.0 {
            return Err(Error::Config(
                "analysis.detour_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.ngram_lengths.is_empty() || self.ngram_lengths.iter().any(|&n| n == 0) {
            return Err(Error::Config(
                "analysis.ngram_lengths must be a non-empty list of positive lengths".to_string(),
            ));
        }
        if self.top_patterns == 0 {
            return Err(Error::Config(
                "analysis.top_patterns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_session_gap() -> u64 {
    1800
}

fn default_idle_gap() -> u64 {
    300
}

fn default_rework_threshold() -> usize {
    3
}

fn default_detour_multiplier() -> f64 {
    1.5
}

fn default_ngram_lengths() -> Vec<usize> {
    vec![2, 3]
}

fn default_top_patterns() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analysis.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/flowlens/config.toml` (~/.config/flowlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("flowlens").join("config.toml")
    }

    /// Returns the data directory path (for action logs)
    ///
    /// `$XDG_DATA_HOME/flowlens/` (~/.local/share/flowlens/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("flowlens")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/flowlens/` (~/.local/state/flowlens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("flowlens")
    }

    /// Returns the directory holding per-flow action logs
    ///
    /// `$XDG_DATA_HOME/flowlens/flows/` (~/.local/share/flowlens/flows/)
    pub fn flows_dir() -> PathBuf {
        Self::data_dir().join("flows")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/flowlens/flowlens.log` (~/.local/state/flowlens/flowlens.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("flowlens.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.recorder.enabled);
        assert_eq!(config.recorder.queue_capacity, 1024);
        assert_eq!(config.analysis.session_gap_secs, 1800);
        assert_eq!(config.analysis.idle_gap_secs, 300);
        assert_eq!(config.analysis.rework_threshold, 3);
        assert_eq!(config.analysis.ngram_lengths, vec![2, 3]);
        assert!(config.analysis.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[recorder]
queue_capacity = 64
payload_cap_bytes = 512

[analysis]
session_gap_secs = 900
idle_gap_secs = 120
top_patterns = 5

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.recorder.queue_capacity, 64);
        assert_eq!(config.recorder.payload_cap_bytes, 512);
        assert_eq!(config.analysis.session_gap_secs, 900);
        assert_eq!(config.analysis.idle_gap_secs, 120);
        assert_eq!(config.analysis.top_patterns, 5);
        // untouched sections keep their defaults
        assert_eq!(config.analysis.detour_multiplier, 1.5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_analysis_validation() {
        let mut analysis = AnalysisConfig::default();
        assert!(analysis.validate().is_ok());

        // idle gap must stay below the session gap, otherwise every idle
        // span would already have split the session
        analysis.idle_gap_secs = analysis.session_gap_secs;
        assert!(analysis.validate().is_err());

        let mut analysis = AnalysisConfig::default();
        analysis.rework_threshold = 1;
        assert!(analysis.validate().is_err());

        let mut analysis = AnalysisConfig::default();
        analysis.ngram_lengths = vec![];
        assert!(analysis.validate().is_err());

        let mut analysis = AnalysisConfig::default();
        analysis.detour_multiplier = 0.5;
        assert!(analysis.validate().is_err());
    }
}
