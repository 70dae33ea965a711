//! User preferences and on-disk locations.
//!
//! Preferences live in `preferences.json` under the app's data directory.
//! A missing file means defaults; every field is individually defaulted so
//! partial files stay valid across upgrades.

use crate::api::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use torii_core::{DEFAULT_BUFFER_SIZE, DEFAULT_TYPO_STRICTNESS};

const APP_DIR: &str = "torii";
const PREFERENCES_FILE: &str = "preferences.json";
const DB_FILE: &str = "torii.sqlite3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no data directory available on this platform")]
    NoDataDir,

    #[error("failed to read preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed preferences file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub review_buffer_size: usize,
    pub lesson_buffer_size: usize,
    pub typo_strictness: f64,
    pub api_base_url: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            review_buffer_size: DEFAULT_BUFFER_SIZE,
            lesson_buffer_size: DEFAULT_BUFFER_SIZE,
            typo_strictness: DEFAULT_TYPO_STRICTNESS,
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Preferences {
    /// Load preferences from the data directory. Missing file is fine;
    /// a present but malformed file is an error the user should see.
    pub fn load() -> Result<Self, ConfigError> {
        let path = data_dir()?.join(PREFERENCES_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// App data directory, created on first use.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?.join(APP_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn db_path() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join(DB_FILE))
}
