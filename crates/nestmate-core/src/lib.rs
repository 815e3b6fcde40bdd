//! Nestmate Core — domain models, repository traits, and error types for
//! the match-group formation protocol.
//!
//! This crate has no I/O dependencies; persistence lives in `nestmate-db`
//! and the protocol operations in `nestmate-match`.

pub mod error;
pub mod models;
pub mod notify;
pub mod repository;

pub use error::{NestmateError, NestmateResult};
