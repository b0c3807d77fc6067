use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
    #[error("interval already recorded")]
    DuplicateInterval,
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}
