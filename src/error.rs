use thiserror::Error;

use crate::period::Period;

#[derive(Error, Debug)]
pub enum CashplanError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Load failed: {0}")]
    Load(String),

    #[error("Save failed: {0}")]
    Save(String),

    #[error("Conflict in {0}: this device has newer edits than the shared copy. Run `cashplan sync --force` to accept the shared copy.")]
    Conflict(Period),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid period: {0} (expected YYYY-MM)")]
    InvalidPeriod(String),

    #[error("Not signed in. Run `cashplan login <user>` first.")]
    NotSignedIn,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CashplanError>;
