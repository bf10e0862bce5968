//! TOML-based application configuration.
//!
//! Controls the starting score and the three background processes:
//! - Due-time reminders
//! - The end-of-day missed-task sweep
//! - The weekend planning prompt
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::scoring::{MAX_SCORE, MIN_SCORE};

/// Productivity score configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Score of a planner with no saved state.
    #[serde(default = "default_initial_score")]
    pub initial: i32,
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reminder_interval")]
    pub interval_secs: u64,
}

/// End-of-day sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfDayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local hour (0-23) from which unfinished tasks are swept.
    #[serde(default = "default_threshold_hour")]
    pub threshold_hour: u32,
    #[serde(default = "default_end_of_day_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub summary_notification: bool,
}

/// Weekend planning prompt configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendPlanningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// Inclusive.
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_weekend_interval")]
    pub interval_secs: u64,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub end_of_day: EndOfDayConfig,
    #[serde(default)]
    pub weekend_planning: WeekendPlanningConfig,
}

fn default_true() -> bool {
    true
}
fn default_initial_score() -> i32 {
    crate::scoring::DEFAULT_INITIAL_SCORE
}
fn default_reminder_interval() -> u64 {
    60
}
fn default_threshold_hour() -> u32 {
    crate::end_of_day::DEFAULT_THRESHOLD_HOUR
}
fn default_end_of_day_interval() -> u64 {
    30 * 60
}
fn default_start_hour() -> u32 {
    crate::weekend::DEFAULT_START_HOUR
}
fn default_end_hour() -> u32 {
    crate::weekend::DEFAULT_END_HOUR
}
fn default_weekend_interval() -> u64 {
    60 * 60
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_score(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reminder_interval(),
        }
    }
}

impl Default for EndOfDayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_hour: default_threshold_hour(),
            interval_secs: default_end_of_day_interval(),
            summary_notification: true,
        }
    }
}

impl Default for WeekendPlanningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            interval_secs: default_weekend_interval(),
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }
}

impl EndOfDayConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }
}

impl WeekendPlanningConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }
}

/// Longest accepted timer period: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

fn secs(value: u64) -> Duration {
    // Bounded by MAX_INTERVAL_SECS, so the cast cannot truncate.
    Duration::seconds(value.min(MAX_INTERVAL_SECS) as i64)
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent) = parent {
            for part in parent.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a non-negative integer")))?
                    .into(),
            ),
            serde_json::Value::Object(_) => return Err(invalid("cannot replace a whole section".into())),
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data dir, writing the defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data dir.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from the data dir, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is out of range. `self` is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Check hour ranges and timer periods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |ok: bool, key: &str, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: message.to_string(),
                })
            }
        };
        let period = |secs: u64| secs > 0 && secs <= MAX_INTERVAL_SECS;
        let period_message = "must be between 1 second and one week";
        check(
            (MIN_SCORE..=MAX_SCORE).contains(&self.score.initial),
            "score.initial",
            "must be 0-1000",
        )?;
        check(period(self.reminders.interval_secs), "reminders.interval_secs", period_message)?;
        check(self.end_of_day.threshold_hour <= 23, "end_of_day.threshold_hour", "must be 0-23")?;
        check(period(self.end_of_day.interval_secs), "end_of_day.interval_secs", period_message)?;
        check(self.weekend_planning.start_hour <= 23, "weekend_planning.start_hour", "must be 0-23")?;
        check(self.weekend_planning.end_hour <= 23, "weekend_planning.end_hour", "must be 0-23")?;
        check(
            self.weekend_planning.start_hour <= self.weekend_planning.end_hour,
            "weekend_planning.end_hour",
            "must not be before start_hour",
        )?;
        check(
            period(self.weekend_planning.interval_secs),
            "weekend_planning.interval_secs",
            period_message,
        )
    }
}
