//! Protocol error types.

use nestmate_core::error::NestmateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("actor is not a confirmed member of this group")]
    NotAMember,

    #[error("user is already a member or pending member of this group")]
    AlreadyMember,

    #[error("actor has no invitation in this group")]
    NotInvited,

    #[error("actor has no outstanding approval for this member")]
    NotAnApprover,

    #[error("group is at its member limit")]
    GroupFull,

    #[error("an open request between these users already exists")]
    DuplicateRequest,

    #[error("operation only applies to an unconfirmed request")]
    NotARequest,

    #[error("cannot create a match request with yourself")]
    SelfRequest,

    #[error("multiple pending members need this actor's approval; a target must be named")]
    AmbiguousAction,
}

impl From<MatchError> for NestmateError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::DuplicateRequest => NestmateError::Conflict {
                message: err.to_string(),
            },
            other => NestmateError::Validation {
                message: other.to_string(),
            },
        }
    }
}
