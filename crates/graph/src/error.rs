use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Record not found: {0}")]
    UnknownRecord(String),

    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),
}
