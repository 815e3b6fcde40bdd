//! Match-group domain model.
//!
//! A match group tracks a set of users forming a shared household. Two
//! independent state axes are modeled explicitly: the group-level
//! [`GroupStatus`] and, per pending member, a negotiation sub-state made of
//! an [`Invitation`](super::invitation::Invitation) row (invitee acceptance)
//! and zero or more [`ApprovalHold`](super::invitation::ApprovalHold) rows
//! (outstanding member approvals). A group can be fully formed at the group
//! level while several invitees are still mid-negotiation.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invitation::{ApprovalHold, Invitation};

/// Group-level admission state.
///
/// `Confirmed` is the canonical settled state; `Active` is accepted on read
/// for rows written before the two names were consolidated, and is treated
/// as settled everywhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupStatus {
    Requested,
    Confirmed,
    Active,
}

impl GroupStatus {
    /// True for groups past the initial request phase.
    pub fn is_settled(self) -> bool {
        matches!(self, GroupStatus::Confirmed | GroupStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchGroup {
    pub id: Uuid,
    pub status: GroupStatus,
    /// Set when the group formed around a listed property; `None` for a
    /// pure roommate group.
    pub property_id: Option<Uuid>,
    pub requested_by: Uuid,
    pub group_name: String,
    pub move_in_date: Option<NaiveDate>,
    pub message: String,
    /// Optimistic-concurrency counter; bumped on every group-row write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating the initial two-person request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchGroup {
    pub requested_by: Uuid,
    pub target_id: Uuid,
    pub property_id: Option<Uuid>,
    pub group_name: String,
    pub move_in_date: Option<NaiveDate>,
    pub message: String,
}

/// Pair-uniqueness key for an open initial request: the two user ids in
/// sorted order. A unique index on this key collapses mirror requests
/// between the same pair into one row.
pub fn request_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

/// Read model for one group: the group row plus its member, invitation, and
/// approval-hold rows. This is the unit the projector and the lifecycle
/// service reason over.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub group: MatchGroup,
    /// Confirmed member ids.
    pub members: Vec<Uuid>,
    /// One entry per pending member.
    pub invitations: Vec<Invitation>,
    /// Outstanding approvals across all pending members.
    pub holds: Vec<ApprovalHold>,
}

impl GroupSnapshot {
    pub fn roommate_ids(&self) -> BTreeSet<Uuid> {
        self.members.iter().copied().collect()
    }

    pub fn pending_member_ids(&self) -> BTreeSet<Uuid> {
        self.invitations.iter().map(|i| i.invitee_id).collect()
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn invitation_for(&self, invitee_id: Uuid) -> Option<&Invitation> {
        self.invitations.iter().find(|i| i.invitee_id == invitee_id)
    }

    /// Confirmed members whose approval for `pending_id` is still
    /// outstanding. Empty once everyone (or no one) had to approve.
    pub fn needs_approval_from(&self, pending_id: Uuid) -> BTreeSet<Uuid> {
        self.holds
            .iter()
            .filter(|h| h.pending_id == pending_id)
            .map(|h| h.approver_id)
            .collect()
    }

    /// The initial two-person request: one confirmed member, one invitee,
    /// and no approval negotiation at all.
    pub fn is_degenerate_request(&self) -> bool {
        self.group.status == GroupStatus::Requested
            && self.members.len() == 1
            && self.invitations.len() == 1
            && self.holds.is_empty()
    }

    /// Whether `pending_id` has satisfied the admission condition: invitee
    /// accepted and no approvals outstanding.
    pub fn is_admittable(&self, pending_id: Uuid) -> bool {
        self.invitation_for(pending_id)
            .is_some_and(|inv| inv.accepted && self.needs_approval_from(pending_id).is_empty())
    }

    /// Structural invariants; integration tests assert this after every
    /// mutation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let members = self.roommate_ids();
        let pending = self.pending_member_ids();
        if let Some(id) = members.intersection(&pending).next() {
            return Err(format!("user {id} is both confirmed and pending"));
        }
        for hold in &self.holds {
            if !pending.contains(&hold.pending_id) {
                return Err(format!(
                    "approval hold for {} without an invitation",
                    hold.pending_id
                ));
            }
            if !members.contains(&hold.approver_id) {
                return Err(format!(
                    "approval hold held by non-member {}",
                    hold.approver_id
                ));
            }
        }
        Ok(())
    }
}
