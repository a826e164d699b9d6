use crate::types::Category;
use thiserror::Error;

pub type PoppyResult<T> = Result<T, PoppyError>;

#[derive(Error, Debug)]
pub enum PoppyError {
    #[error("No usable interactions for category {0}")]
    EmptyCategory(Category),

    #[error("Cannot encode identities: {0}")]
    EmptyIdentitySet(String),

    #[error("Affinity matrix has no observed cells")]
    NoObservedCells,

    #[error("Prediction table missing for category {0}")]
    MissingCategoryTable(Category),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
