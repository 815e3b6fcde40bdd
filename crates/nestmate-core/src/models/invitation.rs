//! Invitation and approval-hold domain models.
//!
//! The negotiation state for a pending member is normalized into rows
//! instead of a mutable map: the invitation row carries the invitee's
//! acceptance flag, and each outstanding approval is its own row. Approving
//! deletes exactly one hold row, so the set of required approvers can only
//! shrink after invite time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pending member of a group. The row's existence is what makes the
/// invitee "pending"; it is deleted when the member is confirmed or the
/// request is withdrawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub group_id: Uuid,
    pub invitee_id: Uuid,
    pub invited_by: Uuid,
    pub accepted: bool,
    pub invited_at: DateTime<Utc>,
}

/// One outstanding approval required before `pending_id` can join.
/// Created at invite time for every confirmed member except the inviter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalHold {
    pub group_id: Uuid,
    pub pending_id: Uuid,
    pub approver_id: Uuid,
    pub created_at: DateTime<Utc>,
}
