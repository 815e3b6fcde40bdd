//! Database-specific error types and conversions.

use nestmate_core::error::NestmateError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl From<DbError> for NestmateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => NestmateError::NotFound { entity, id },
            DbError::Conflict(message) => NestmateError::Conflict { message },
            other => NestmateError::Database(other.to_string()),
        }
    }
}
