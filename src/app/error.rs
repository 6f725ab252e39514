use thiserror::Error;

/// Why a mutation or query was rejected. Any error aborts the whole operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Signature(String),
    #[error("upstream failure: {0:#}")]
    Upstream(anyhow::Error),
    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
