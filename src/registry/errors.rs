use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Dataset path does not exist: {0}")]
    DatasetPathMissing(String),

    #[error("Pipeline run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Registry error: {0}")]
    Internal(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
