use std::error::Error;
use thiserror::Error;

/// Result alias for repository operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by repository backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot be reached at all.
    #[error("repository unavailable: {message}")]
    Unavailable {
        /// Human-readable summary of the backend failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A query against a reachable backend failed.
    #[error("repository query against `{collection}` failed")]
    Query {
        /// Collection or table the query targeted.
        collection: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a query error from any backend failure.
    pub fn query(collection: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Query {
            collection,
            source: Box::new(source),
        }
    }
}
