//! Facts about a capture session, fixed when it starts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capture context, recorded in the `mode` metadata line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Owned application window
    Gui,
    /// System-wide hook or tap, run from a terminal
    Terminal,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gui => "gui",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gui" => Ok(Self::Gui),
            "terminal" => Ok(Self::Terminal),
            other => Err(format!("unknown capture mode '{}' (expected gui or terminal)", other)),
        }
    }
}

/// `<os>-<arch>` of the running build, e.g. `linux-x86_64`
pub fn platform_identifier() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Immutable session facts written at the top of the CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub platform: String,
    pub language: &'static str,
    pub mode: CaptureMode,
    pub clock_source: String,
    pub start_time_utc: DateTime<Utc>,
}

impl SessionMetadata {
    /// Metadata for a session starting now
    pub fn new(mode: CaptureMode, clock_source: &str) -> Self {
        Self::with_start_time(mode, clock_source, Utc::now())
    }

    pub fn with_start_time(mode: CaptureMode, clock_source: &str, start: DateTime<Utc>) -> Self {
        Self {
            platform: platform_identifier(),
            language: "rust",
            mode,
            clock_source: clock_source.to_string(),
            start_time_utc: start,
        }
    }

    /// ISO-8601 start time with microseconds, `2024-01-02T03:04:05.123456Z`
    pub fn start_time_string(&self) -> String {
        self.start_time_utc
            .format("%Y-%m-%dT%H:%M:%S%.6fZ")
            .to_string()
    }

    /// `(key, value)` pairs in CSV metadata order
    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("platform", self.platform.clone()),
            ("language", self.language.to_string()),
            ("mode", self.mode.to_string()),
            ("clock_source", self.clock_source.clone()),
            ("start_time_utc", self.start_time_string()),
        ]
    }
}
