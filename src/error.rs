use sea_orm::DbErr;
use tokio::task::JoinError;

/// Failure taxonomy raised by the use cases. Every validation failure is
/// reported synchronously and verbatim; nothing in this crate retries.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("aggregation task failed: {0}")]
    Aggregation(#[from] JoinError),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound(format!("{entity} {id} not found"))
    }
}
