//! Repository trait for match-group persistence.
//!
//! All operations are async. The store is the unit of consistency: each
//! method is individually atomic, and the multi-row operations
//! ([`MatchGroupRepository::add_invitation`],
//! [`MatchGroupRepository::promote_member`],
//! [`MatchGroupRepository::delete_group`]) commit as single transactions.

use uuid::Uuid;

use crate::error::NestmateResult;
use crate::models::group::{CreateMatchGroup, GroupSnapshot, GroupStatus, MatchGroup};

pub trait MatchGroupRepository: Send + Sync {
    /// Create the initial two-person request: a `Requested` group with one
    /// confirmed member (the requester) and one invitation carrying no
    /// approval holds. Fails with `Conflict` if an open request between the
    /// same pair already exists (unique `request_key`).
    fn create_request(
        &self,
        input: CreateMatchGroup,
    ) -> impl Future<Output = NestmateResult<MatchGroup>> + Send;

    /// Load a group with its member, invitation, and hold rows.
    fn load(&self, group_id: Uuid) -> impl Future<Output = NestmateResult<GroupSnapshot>> + Send;

    /// Open (`Requested`) request between the two users, if any.
    fn find_open_request_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> impl Future<Output = NestmateResult<Option<MatchGroup>>> + Send;

    /// The settled group the user is a confirmed member of, if any.
    fn find_active_group_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = NestmateResult<Option<GroupSnapshot>>> + Send;

    /// Every group the user touches: as a confirmed member or as a pending
    /// invitee. The requester needs no separate scan because creation
    /// inserts them as the group's first member.
    fn groups_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = NestmateResult<Vec<GroupSnapshot>>> + Send;

    /// Create an invitation row plus one approval hold per listed approver,
    /// in one transaction. Fails with `Conflict` if the invitee already has
    /// an invitation in this group.
    fn add_invitation(
        &self,
        group_id: Uuid,
        invitee_id: Uuid,
        invited_by: Uuid,
        approvers: &[Uuid],
    ) -> impl Future<Output = NestmateResult<()>> + Send;

    /// Set the invitee's acceptance flag. `NotFound` if no invitation row
    /// exists for the invitee.
    fn mark_invitation_accepted(
        &self,
        group_id: Uuid,
        invitee_id: Uuid,
    ) -> impl Future<Output = NestmateResult<()>> + Send;

    /// Delete one approval hold. Returns the number of holds still
    /// outstanding for the pending member. `Conflict` if the hold is
    /// already gone (double approve, or the member was confirmed or
    /// removed concurrently).
    fn clear_approval(
        &self,
        group_id: Uuid,
        pending_id: Uuid,
        approver_id: Uuid,
    ) -> impl Future<Output = NestmateResult<u64>> + Send;

    /// Move a pending member into the confirmed set: verify the invitation
    /// exists, is accepted, and has zero holds; delete the invitation;
    /// insert the member row; settle the group status. One transaction —
    /// a concurrent promote of the same id fails with `Conflict` rather
    /// than duplicating the member.
    fn promote_member(
        &self,
        group_id: Uuid,
        pending_id: Uuid,
    ) -> impl Future<Output = NestmateResult<()>> + Send;

    /// Optimistically update the group status: the write only applies if
    /// the stored version still equals `expected_version`, else `Conflict`.
    fn set_status(
        &self,
        group_id: Uuid,
        status: GroupStatus,
        expected_version: u64,
    ) -> impl Future<Output = NestmateResult<MatchGroup>> + Send;

    /// Remove a confirmed member. `NotFound` if the user is not a member.
    fn remove_member(
        &self,
        group_id: Uuid,
        member_id: Uuid,
    ) -> impl Future<Output = NestmateResult<()>> + Send;

    /// Delete the group row and all child rows. Used only for declining or
    /// withdrawing an unconfirmed request; irreversible.
    fn delete_group(&self, group_id: Uuid) -> impl Future<Output = NestmateResult<()>> + Send;
}
