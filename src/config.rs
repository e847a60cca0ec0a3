//! Configuration management for keyboard-timing
//!
//! Settings are loaded from a platform-specific config file; a missing file
//! means defaults. Command line flags override whatever the file says.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keyboard-timing/config.toml` |
//! | macOS | `~/Library/Application Support/keyboard-timing/config.toml` |
//! | Windows | `%APPDATA%\keyboard-timing\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use keyboard_timing::Config;
//!
//! let mut config = Config::load().unwrap_or_default();
//! config.capture.capacity = 250_000;
//! config.save().expect("Failed to save config");
//! ```

use crate::capture::SourceKind;
use crate::session::{CaptureMode, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path to the config file, creating its directory if needed.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("keyboard-timing");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Recorder settings, one TOML table per section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub output: OutputConfig,
    pub ui: UiConfig,
}

/// Capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum records kept per session
    pub capacity: usize,
    /// Sampling interval of the polled source, in microseconds
    pub poll_interval_us: u64,
    /// Key that ends an owned-window session
    pub stop_key: String,
    pub source: SourceKind,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            poll_interval_us: 1000,
            stop_key: "escape".to_string(),
            source: SourceKind::Auto,
        }
    }
}

/// Output location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for default output files. Relative paths are resolved
    /// against the executable's directory.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Capture window redraws per second
    pub refresh_rate_hz: u32,
    pub theme: Theme,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 30,
            theme: Theme::Dark,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// File name used when no output path is given, e.g. `rust_gui_windows.csv`
pub fn variant_file_name(mode: CaptureMode) -> String {
    format!("rust_{}_{}.csv", mode, std::env::consts::OS)
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Redraw and input-poll interval of the capture window
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz.max(1) as u64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.capture.poll_interval_us.max(1))
    }

    /// Default output file for `mode`, resolved against `exe_dir`
    pub fn default_output_path(&self, mode: CaptureMode, exe_dir: &Path) -> PathBuf {
        exe_dir
            .join(&self.output.directory)
            .join(variant_file_name(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_config_path() -> PathBuf {
        env::temp_dir().join(format!("keyboard-timing-test-{}.toml", std::process::id()))
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.capture.capacity, 100_000);
        assert_eq!(config.capture.poll_interval_us, 1000);
        assert_eq!(config.capture.stop_key, "escape");
        assert_eq!(config.capture.source, SourceKind::Auto);
        assert_eq!(config.output.directory, PathBuf::from("output"));
        assert_eq!(config.ui.refresh_rate_hz, 30);
        assert_eq!(config.ui.theme, Theme::Dark);
    }

    #[test]
    fn config_refresh_interval() {
        let mut config = Config::default();
        assert_eq!(config.refresh_interval().as_micros(), 33333);

        config.ui.refresh_rate_hz = 0;
        assert_eq!(config.refresh_interval().as_micros(), 1_000_000);
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let path = temp_config_path();

        let mut config = Config::default();
        config.capture.capacity = 42;
        config.capture.source = SourceKind::Poll;
        config.ui.theme = Theme::Light;

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        assert_eq!(loaded.capture.capacity, 42);
        assert_eq!(loaded.capture.source, SourceKind::Poll);
        assert_eq!(loaded.ui.theme, Theme::Light);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_load_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
[capture]
capacity = 500
source = "evdev"
"#;
        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.capture.capacity, 500);
        assert_eq!(config.capture.source, SourceKind::Evdev);
        assert_eq!(config.capture.stop_key, "escape");
        assert_eq!(config.ui.refresh_rate_hz, 30);
    }

    #[test]
    fn config_serializes_to_toml() {
        let toml_str = toml::to_string_pretty(&Config::default()).expect("Failed to serialize");

        assert!(toml_str.contains("[capture]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[ui]"));
        assert!(toml_str.contains("capacity = 100000"));
        assert!(toml_str.contains("source = \"auto\""));
    }

    #[test]
    fn unknown_source_is_a_parse_error() {
        let result: Result<Config, _> = toml::from_str("[capture]\nsource = \"x11\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn default_output_path_names_variant() {
        let config = Config::default();
        let path = config.default_output_path(CaptureMode::Gui, Path::new("/opt/kt"));
        assert_eq!(
            path,
            Path::new("/opt/kt")
                .join("output")
                .join(format!("rust_gui_{}.csv", std::env::consts::OS))
        );
    }

    #[test]
    fn absolute_output_directory_wins() {
        let mut config = Config::default();
        config.output.directory = env::temp_dir();
        let path = config.default_output_path(CaptureMode::Terminal, Path::new("/opt/kt"));
        assert!(path.starts_with(env::temp_dir()));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(err.to_string(), "Could not determine config directory");

        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }
}
