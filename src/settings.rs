use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CashplanError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Shared document store; defaults to `<data_dir>/shared.db`.
    #[serde(default)]
    pub store_path: Option<String>,
    /// Signed-in identity. Nothing is loaded or saved without one.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_immediate_save_ms")]
    pub immediate_save_ms: u64,
    #[serde(default = "default_status_reset_ms")]
    pub status_reset_ms: u64,
    #[serde(default = "default_conflict_threshold_ms")]
    pub conflict_threshold_ms: i64,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_immediate_save_ms() -> u64 {
    150
}

fn default_status_reset_ms() -> u64 {
    2000
}

fn default_conflict_threshold_ms() -> i64 {
    60_000
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            immediate_save_ms: default_immediate_save_ms(),
            status_reset_ms: default_status_reset_ms(),
            conflict_threshold_ms: default_conflict_threshold_ms(),
        }
    }
}

impl SyncSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn immediate_save(&self) -> Duration {
        Duration::from_millis(self.immediate_save_ms)
    }

    pub fn status_reset(&self) -> Duration {
        Duration::from_millis(self.status_reset_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            store_path: None,
            user: None,
            sync: SyncSettings::default(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn local_db_path(&self) -> PathBuf {
        self.data_path().join("cashplan.db")
    }

    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(p) => PathBuf::from(p),
            None => self.data_path().join("shared.db"),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cashplan")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("cashplan")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CashplanError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
