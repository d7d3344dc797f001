//! Configuration loading and persistence
//!
//! Configuration is loaded from `~/.config/telemetry-gate/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/telemetry-gate/` (~/.config/telemetry-gate/)
//! - Data: `$XDG_DATA_HOME/telemetry-gate/` (~/.local/share/telemetry-gate/)
//! - State/Logs: `$XDG_STATE_HOME/telemetry-gate/` (~/.local/state/telemetry-gate/)
//!
//! The `mode` key doubles as the consent record: while it is absent the user
//! has never answered the prompt; once the prompt handler calls
//! [`FileConfiguration::save_mode`] the decision is durable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::ConfigurationReader;

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

/// The user's telemetry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Telemetry on, events go to the production destination.
    Normal,
    /// Telemetry on, events go to the debug destination.
    Debug,
    /// Telemetry off.
    Disabled,
}

/// Main configuration struct
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Telemetry mode. `None` means the user has never been asked.
    pub mode: Option<Mode>,

    /// Segment destination configuration
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Segment destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Write key for the production destination
    pub write_key: Option<String>,

    /// Write key for the debug destination (falls back to `write_key`)
    pub debug_write_key: Option<String>,

    /// API base URL
    #[serde(default = "default_segment_endpoint")]
    pub endpoint: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_segment_timeout")]
    pub timeout_secs: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            write_key: None,
            debug_write_key: None,
            endpoint: default_segment_endpoint(),
            timeout_secs: default_segment_timeout(),
        }
    }
}

impl SegmentConfig {
    /// Resolve the write key for the given mode, if any is configured.
    pub fn key_for(&self, debug: bool) -> Option<&str> {
        if debug {
            self.debug_write_key
                .as_deref()
                .or(self.write_key.as_deref())
        } else {
            self.write_key.as_deref()
        }
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.write_key.is_none() && self.debug_write_key.is_none() {
            return Err(Error::Config(
                "segment.write_key is required".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(Error::Config("segment.endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_segment_endpoint() -> String {
    "https://api.segment.io/v1".to_string()
}

fn default_segment_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TelemetryConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(TelemetryConfig::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: TelemetryConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Persist configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// True when the user has opted in.
    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, Some(Mode::Normal) | Some(Mode::Debug))
    }

    /// True once a mode has been explicitly recorded.
    pub fn is_configured(&self) -> bool {
        self.mode.is_some()
    }

    /// True when events should go to the debug destination.
    pub fn is_debug(&self) -> bool {
        self.mode == Some(Mode::Debug)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/telemetry-gate/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("telemetry-gate").join("config.toml")
    }

    /// Returns the data directory path (for the anonymous id)
    ///
    /// `$XDG_DATA_HOME/telemetry-gate/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("telemetry-gate")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/telemetry-gate/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("telemetry-gate")
    }
}

/// File-backed [`ConfigurationReader`] with live re-read semantics.
///
/// Every query re-reads the config file, so a consent decision recorded by
/// the prompt handler is observed by the very next dispatch decision. Any
/// read failure counts as "not enabled, not configured": the gate fails
/// closed.
#[derive(Debug, Clone)]
pub struct FileConfiguration {
    path: PathBuf,
}

impl FileConfiguration {
    /// Reader over the default config path.
    pub fn new() -> Self {
        Self::at(TelemetryConfig::config_path())
    }

    /// Reader over a specific config file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<TelemetryConfig> {
        if !self.path.exists() {
            return None;
        }
        match TelemetryConfig::load_from(&self.path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read telemetry config, treating as disabled");
                None
            }
        }
    }

    /// Record the user's decision. This is what the consent prompt handler
    /// calls when the user answers.
    pub fn save_mode(&self, mode: Mode) -> Result<()> {
        let mut config = self.read().unwrap_or_default();
        config.mode = Some(mode);
        config.save_to(&self.path)
    }
}

impl Default for FileConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationReader for FileConfiguration {
    fn is_enabled(&self) -> bool {
        self.read().map(|c| c.is_enabled()).unwrap_or(false)
    }

    fn is_configured(&self) -> bool {
        self.read().map(|c| c.is_configured()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = TelemetryConfig::default();
        assert!(!config.is_enabled());
        assert!(!config.is_configured());
        assert!(!config.is_debug());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
mode = "normal"

[segment]
write_key = "sk_prod_xxxx"
debug_write_key = "sk_dbg_xxxx"

[logging]
level = "debug"
"#;
        let config: TelemetryConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.mode, Some(Mode::Normal));
        assert!(config.is_enabled());
        assert!(config.is_configured());
        assert_eq!(config.segment.write_key.as_deref(), Some("sk_prod_xxxx"));
        assert_eq!(config.segment.endpoint, "https://api.segment.io/v1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_disabled_mode() {
        let config: TelemetryConfig = toml::from_str("mode = \"disabled\"").unwrap();
        assert!(!config.is_enabled());
        assert!(config.is_configured());
    }

    #[test]
    fn test_segment_key_resolution() {
        let segment = SegmentConfig {
            write_key: Some("prod".to_string()),
            debug_write_key: Some("dbg".to_string()),
            ..Default::default()
        };
        assert_eq!(segment.key_for(false), Some("prod"));
        assert_eq!(segment.key_for(true), Some("dbg"));

        let fallback = SegmentConfig {
            write_key: Some("prod".to_string()),
            ..Default::default()
        };
        assert_eq!(fallback.key_for(true), Some("prod"));
    }

    #[test]
    fn test_segment_validation() {
        assert!(SegmentConfig::default().validate().is_err());

        let segment = SegmentConfig {
            write_key: Some("sk".to_string()),
            ..Default::default()
        };
        assert!(segment.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = TelemetryConfig {
            mode: Some(Mode::Debug),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let reloaded = TelemetryConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.mode, Some(Mode::Debug));
        assert!(reloaded.is_debug());
    }

    #[test]
    fn test_file_configuration_rereads_live() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let reader = FileConfiguration::at(&path);

        // No file yet: fail closed.
        assert!(!reader.is_enabled());
        assert!(!reader.is_configured());

        reader.save_mode(Mode::Normal).unwrap();
        assert!(reader.is_enabled());
        assert!(reader.is_configured());

        reader.save_mode(Mode::Disabled).unwrap();
        assert!(!reader.is_enabled());
        assert!(reader.is_configured());
    }

    #[test]
    fn test_file_configuration_garbage_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = 17").unwrap();

        let reader = FileConfiguration::at(&path);
        assert!(!reader.is_enabled());
        assert!(!reader.is_configured());
    }
}
