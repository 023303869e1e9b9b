use grove_types::CoreError;

/// Errors surfaced by entity stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional create lost to an existing record
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => CoreError::Upstream(format!("store: not found: {msg}")),
            StoreError::Conflict(msg) => CoreError::InvalidState(format!("store conflict: {msg}")),
            StoreError::Backend(msg) => CoreError::Upstream(format!("store: {msg}")),
        }
    }
}
