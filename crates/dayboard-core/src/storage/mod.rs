mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, EndOfDayConfig, ReminderConfig, ScoreConfig, WeekendPlanningConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `DAYBOARD_DATA_DIR` wins when set. Otherwise `~/.config/dayboard[-dev]/`,
/// with the `-dev` suffix when `DAYBOARD_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("DAYBOARD_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DAYBOARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dayboard-dev")
            } else {
                base_dir.join("dayboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
