use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("invalid configuration: {0}")] InvalidConfig(String),
    #[error("insufficient initial positions: need {needed} groups, found {found}")]
    InsufficientPositions { needed: usize, found: usize },
    #[error("initial position group {group} has {found} points, need {needed}")]
    GroupTooShort { group: usize, needed: usize, found: usize },
    #[error("config source error: {0}")] Source(#[from] config::ConfigError),
    #[error("io error: {0}")] Io(#[from] std::io::Error),
    #[error("serde error: {0}")] Serde(#[from] serde_json::Error),
    #[error("csv error: {0}")] Csv(#[from] csv::Error),
}

pub type Result<T, E = CoverageError> = std::result::Result<T, E>;
