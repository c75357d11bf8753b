pub mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, StorageConfig, StudyConfig};
pub use database::{Database, TemplateSummary};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `FLASHCARDS_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/flashcards[-dev]/`, with the `-dev` suffix when
/// `FLASHCARDS_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FLASHCARDS_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FLASHCARDS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("flashcards-dev")
            } else {
                base_dir.join("flashcards")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
