use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid caption ID format: {0}")]
    InvalidId(String),

    #[error("Caption not found: {0}")]
    NotFound(String),

    #[error("Caption text is required")]
    EmptyText,

    #[error("Store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
