//! Notification seam.
//!
//! Delivery itself is an external collaborator; the lifecycle service only
//! emits events through this trait. Implementations must be cheap and
//! synchronous-ish — the service awaits them inline after each mutation and
//! logs (never propagates) their failures.

use uuid::Uuid;

use crate::error::NestmateResult;

/// Events emitted after successful protocol mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    RequestCreated {
        group_id: Uuid,
        requested_by: Uuid,
        target_id: Uuid,
    },
    InvitationCreated {
        group_id: Uuid,
        invited_by: Uuid,
        invitee_id: Uuid,
        /// Members whose approval is now required.
        approvers: Vec<Uuid>,
    },
    InvitationAccepted {
        group_id: Uuid,
        invitee_id: Uuid,
    },
    MemberApproved {
        group_id: Uuid,
        pending_id: Uuid,
        approver_id: Uuid,
    },
    MemberConfirmed {
        group_id: Uuid,
        member_id: Uuid,
    },
    MemberRemoved {
        group_id: Uuid,
        member_id: Uuid,
    },
    RequestDeclined {
        group_id: Uuid,
    },
    RequestWithdrawn {
        group_id: Uuid,
    },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: MatchEvent) -> impl Future<Output = NestmateResult<()>> + Send;
}
