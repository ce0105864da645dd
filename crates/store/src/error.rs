use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("{endpoint} rejected the write: {message}")]
    Rejected { endpoint: String, message: String },

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("{0}")]
    Other(String),
}
