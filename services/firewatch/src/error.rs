//! Error types for the firewatch service

/// Errors that can occur in the firewatch service
#[derive(Debug, thiserror::Error)]
pub enum FirewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive store error: {0}")]
    Store(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

/// Result type alias for firewatch operations
pub type Result<T> = std::result::Result<T, FirewatchError>;
