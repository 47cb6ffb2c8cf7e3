//! Settings and data directory discovery

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

/// Allowed refresh cadences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum RefreshInterval {
    One = 1,
    Two = 2,
    Five = 5,
    Ten = 10,
    Fifteen = 15,
}

impl RefreshInterval {
    pub fn minutes(self) -> u64 {
        self as u64
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.minutes() * 60)
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        RefreshInterval::Five
    }
}

impl TryFrom<u64> for RefreshInterval {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            15 => Ok(Self::Fifteen),
            other => Err(format!("unsupported refresh interval: {} minutes", other)),
        }
    }
}

impl From<RefreshInterval> for u64 {
    fn from(interval: RefreshInterval) -> u64 {
        interval as u64
    }
}

/// Monitor configuration.
///
/// Owned and edited externally; the coordinator re-reads it at the start of
/// every refresh cycle. A missing or invalid file means defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Spend limit for one five-hour block (USD)
    pub block_limit_usd: f64,
    /// Spend limit for the billing week (USD)
    pub weekly_limit_usd: f64,
    /// UTC weekday the billing week resets on, 0 = Sunday .. 6 = Saturday
    pub weekly_reset_weekday: u32,
    /// UTC hour of the weekly reset
    pub weekly_reset_hour: u32,
    pub refresh_interval: RefreshInterval,
    pub notify_at_50: bool,
    pub notify_at_75: bool,
    pub notify_at_90: bool,
    /// Overrides the Claude data directory
    pub data_path: Option<PathBuf>,
    /// Overrides the status file location
    pub status_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_limit_usd: 43.50,
            weekly_limit_usd: 717.0,
            weekly_reset_weekday: 3, // Wednesday
            weekly_reset_hour: 9,
            refresh_interval: RefreshInterval::Five,
            notify_at_50: true,
            notify_at_75: true,
            notify_at_90: true,
            data_path: None,
            status_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the given file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("invalid settings file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Resolved Claude data directory
    pub fn claude_data_dir(&self) -> PathBuf {
        get_claude_data_dir(self.data_path.as_deref())
    }

    /// Directory scanned for usage logs
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_data_dir().join("projects")
    }

    /// Where the status artifact is written
    pub fn status_file_path(&self) -> PathBuf {
        self.status_path
            .clone()
            .unwrap_or_else(|| self.claude_data_dir().join("usage-monitor-status.json"))
    }

    /// Threshold percentages with their enable flags
    pub fn alert_thresholds(&self) -> [(u8, bool); 3] {
        [
            (50, self.notify_at_50),
            (75, self.notify_at_75),
            (90, self.notify_at_90),
        ]
    }
}

/// Get the Claude data directory path
/// Priority: 1. Custom path from settings, 2. CLAUDE_CONFIG_DIR env var, 3. Default ~/.claude
pub fn get_claude_data_dir(custom_path: Option<&Path>) -> PathBuf {
    if let Some(path) = custom_path {
        return path.to_path_buf();
    }

    if let Ok(env_path) = env::var("CLAUDE_CONFIG_DIR") {
        return PathBuf::from(env_path);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".claude");
    }

    // Fallback for edge cases
    PathBuf::from(".claude")
}

/// Default settings file location
pub fn default_settings_path() -> PathBuf {
    get_claude_data_dir(None).join("usage-monitor.json")
}
