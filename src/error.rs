use std::path::PathBuf;

/// Everything that can go wrong while planning purchases.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("marketplace rejected page {page}: {cause}")]
    Api { page: u32, cause: String },

    #[error("price history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("no auction snapshot at {0}; download one first")]
    SnapshotMissing(PathBuf),

    #[error("AH searching is disabled; set market_search = true to use it")]
    MarketSearchDisabled,

    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    #[error("priority {0} is outside 0..=10")]
    InvalidPriority(i64),

    #[error("unknown sort key {0:?}")]
    UnknownSortKey(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
