mod config;
pub mod migrations;
pub mod schedule_db;

pub use config::{AllocationConfig, Config, DisplayConfig, StorageConfig};
pub use schedule_db::ScheduleDb;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/timebudget[-dev]/` based on TIMEBUDGET_ENV.
///
/// Set TIMEBUDGET_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEBUDGET_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timebudget-dev")
    } else {
        base_dir.join("timebudget")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
