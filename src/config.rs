//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working receiver on `/dev/ttyAMA0` at 420000 baud.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::crsf::channels::UnpackStrategy;
use crate::crsf::protocol::CRSF_BAUD_RATE;
use crate::error::{CrsfRxError, Result};

/// Baud rates accepted for the CRSF UART
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [115200, 400000, 420000, 921600, 1870000, 3750000];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Frame decoder configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DecoderConfig {
    #[serde(default)]
    pub unpacker: UnpackStrategy,

    #[serde(default = "default_log_rejections")]
    pub log_rejections: bool,
}

/// Link monitoring configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_failsafe_timeout_ms")]
    pub failsafe_timeout_ms: u64,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Channel snapshot log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_snapshot_path")]
    pub path: String,

    #[serde(default = "default_snapshot_interval_ms")]
    pub interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directives in `RUST_LOG` syntax, e.g. `info` or `crsf_rx=debug,warn`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_baud_rate() -> u32 { CRSF_BAUD_RATE }
fn default_timeout_ms() -> u64 { 100 }

fn default_log_rejections() -> bool { true }

fn default_failsafe_timeout_ms() -> u64 { 500 }
fn default_status_interval_ms() -> u64 { 1000 }

fn default_snapshot_path() -> String { "./logs/channels.jsonl".to_string() }
fn default_snapshot_interval_ms() -> u64 { 100 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            unpacker: UnpackStrategy::default(),
            log_rejections: default_log_rejections(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            failsafe_timeout_ms: default_failsafe_timeout_ms(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_snapshot_path(),
            interval_ms: default_snapshot_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> CrsfRxError {
    CrsfRxError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_rx::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 115200, 400000, 420000, 921600, 1870000, 3750000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.link.failsafe_timeout_ms == 0 || self.link.failsafe_timeout_ms > 60000 {
            return Err(invalid("failsafe_timeout_ms must be between 1 and 60000"));
        }

        if self.link.status_interval_ms == 0 || self.link.status_interval_ms > 60000 {
            return Err(invalid("status_interval_ms must be between 1 and 60000"));
        }

        if self.snapshot.enabled && self.snapshot.path.is_empty() {
            return Err(invalid("snapshot path cannot be empty when enabled"));
        }

        if self.snapshot.interval_ms == 0 || self.snapshot.interval_ms > 60000 {
            return Err(invalid("snapshot interval_ms must be between 1 and 60000"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(invalid("log level cannot be empty"));
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(invalid(format!(
                "log level '{}' is not a valid filter: {}",
                self.logging.level, e
            )));
        }

        if matches!(self.logging.log_dir.as_deref(), Some("")) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let config = Config::parse(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config.serial.baud_rate, CRSF_BAUD_RATE);
        assert_eq!(config.decoder.unpacker, UnpackStrategy::BitCursor);
    }

    #[test]
    fn test_parse_empty_document() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 420000);
        assert_eq!(config.decoder.unpacker, UnpackStrategy::BitCursor);
        assert!(config.decoder.log_rejections);
        assert!(!config.snapshot.enabled);
        assert_eq!(config.logging.log_dir, None);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 921600

[decoder]
unpacker = "fixed_layout"
log_rejections = false

[link]
failsafe_timeout_ms = 250

[snapshot]
enabled = true
path = "/tmp/channels.jsonl"

[logging]
level = "debug"
log_dir = "/var/log/crsf-rx"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.decoder.unpacker, UnpackStrategy::FixedLayout);
        assert!(!config.decoder.log_rejections);
        assert_eq!(config.link.failsafe_timeout_ms, 250);
        assert_eq!(config.link.status_interval_ms, 1000);
        assert!(config.snapshot.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_dir.as_deref(), Some("/var/log/crsf-rx"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/crsf-rx.toml");
        assert!(matches!(result, Err(CrsfRxError::Io(_))));
    }

    #[test]
    fn test_unknown_unpacker_rejected() {
        let result = Config::parse("[decoder]\nunpacker = \"lookup\"\n");
        assert!(matches!(result, Err(CrsfRxError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 9600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());

        config.serial.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_failsafe_timeout_bounds() {
        let mut config = create_valid_config();
        config.link.failsafe_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.link.failsafe_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_interval_bounds() {
        let mut config = create_valid_config();
        config.link.status_interval_ms = 0;
        assert!(config.validate().is_err());

        config.link.status_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_snapshot_path_when_enabled() {
        let mut config = create_valid_config();
        config.snapshot.enabled = true;
        config.snapshot.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_snapshot_path_when_disabled() {
        let mut config = create_valid_config();
        config.snapshot.enabled = false;
        config.snapshot.path = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_snapshot_interval_zero() {
        let mut config = create_valid_config();
        config.snapshot.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "crsf_rx=loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_accepts_filter_directives() {
        for level in ["trace", "warn", "crsf_rx=debug,warn", "crsf_rx::crsf::decoder=trace"] {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level '{}' should be valid", level);
        }
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = create_valid_config();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyAMA0");
        assert_eq!(default_baud_rate(), 420000);
        assert_eq!(default_timeout_ms(), 100);
        assert!(default_log_rejections());
        assert_eq!(default_failsafe_timeout_ms(), 500);
        assert_eq!(default_status_interval_ms(), 1000);
        assert_eq!(default_snapshot_path(), "./logs/channels.jsonl");
        assert_eq!(default_snapshot_interval_ms(), 100);
        assert_eq!(default_log_level(), "info");
    }
}
