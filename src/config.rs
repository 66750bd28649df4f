use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::reminder::{
    DEFAULT_REMINDER_WINDOW_MINS, DEFAULT_SCAN_PERIOD, ReminderConfig, RepeatPolicy,
};
use crate::core::task::Priority;

pub const CONFIG_VERSION: u64 = 1;

fn default_data_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("lantern")
        .join("tasks.org")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("lantern")
        .join("config.json")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct LanternConfig {
    pub version: u64,
    pub data_file: PathBuf,
    pub scan_period_secs: u64,
    pub reminder_window_mins: i64,
    pub repeat_policy: RepeatPolicy,
    /// Priority shown by the "high" view.
    pub high_priority: u8,
    pub debug_logging: bool,
}

impl Default for LanternConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data_file: default_data_file(),
            scan_period_secs: DEFAULT_SCAN_PERIOD.as_secs(),
            reminder_window_mins: DEFAULT_REMINDER_WINDOW_MINS,
            repeat_policy: RepeatPolicy::default(),
            high_priority: Priority::HIGHEST.value(),
            debug_logging: false,
        }
    }
}

impl LanternConfig {
    /// Read the config file, falling back to defaults when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::error!("Failed to parse config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::error!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        };
        config.validated()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Replace out-of-range values with their defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.version != CONFIG_VERSION {
            log::warn!("Config version {} differs from {}, reading what we can", self.version, CONFIG_VERSION);
            self.version = CONFIG_VERSION;
        }
        if self.scan_period_secs == 0 {
            log::warn!("scan_period_secs must be positive, using {}", defaults.scan_period_secs);
            self.scan_period_secs = defaults.scan_period_secs;
        }
        if self.reminder_window_mins <= 0 || chrono::Duration::try_minutes(self.reminder_window_mins).is_none() {
            log::warn!("reminder_window_mins out of range, using {}", defaults.reminder_window_mins);
            self.reminder_window_mins = defaults.reminder_window_mins;
        }
        if Priority::try_from(self.high_priority).is_err() {
            log::warn!("high_priority must be 1-5, using {}", defaults.high_priority);
            self.high_priority = defaults.high_priority;
        }
        self
    }

    pub fn high_priority(&self) -> Priority {
        Priority::try_from(self.high_priority).unwrap_or(Priority::HIGHEST)
    }

    pub fn reminder(&self) -> ReminderConfig {
        ReminderConfig {
            period: Duration::from_secs(self.scan_period_secs),
            window: chrono::Duration::try_minutes(self.reminder_window_mins)
                .filter(|w| *w > chrono::Duration::zero())
                .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_REMINDER_WINDOW_MINS)),
            repeat: self.repeat_policy,
        }
    }
}
