/// Shared error type used across all cronkit crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field-kind name that does not exist. This is a caller bug, not bad
    /// schedule data.
    #[error("unknown schedule field: {0}")]
    UnknownField(String),

    #[error("no default schedule registered for task: {0}")]
    UnknownTask(String),

    #[error("invalid timezone: '{0}'")]
    InvalidTimezone(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
