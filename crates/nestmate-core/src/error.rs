//! Error types for the Nestmate system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NestmateError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// State changed concurrently. Callers must re-fetch current state
    /// before retrying; a blind retry would act on stale data.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NestmateResult<T> = Result<T, NestmateError>;
