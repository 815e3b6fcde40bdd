//! Group lifecycle service — the match-group formation protocol.
//!
//! Generic over the repository and notifier traits so the protocol layer
//! has no dependency on the database crate. Authorization checks happen
//! here against a fresh snapshot; the repository's own guards then make
//! each mutation atomic, so a stale snapshot can cost an actor a
//! `Conflict` but never a lost update.

use nestmate_core::error::{NestmateError, NestmateResult};
use nestmate_core::models::group::{CreateMatchGroup, GroupSnapshot, GroupStatus, MatchGroup};
use nestmate_core::models::view::{UserViews, ViewBucket, ViewRecord};
use nestmate_core::notify::{MatchEvent, Notifier};
use nestmate_core::repository::MatchGroupRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::projection;

pub struct GroupLifecycleService<R: MatchGroupRepository, N: Notifier> {
    repo: R,
    notifier: N,
    config: MatchConfig,
}

impl<R: MatchGroupRepository, N: Notifier> GroupLifecycleService<R, N> {
    pub fn new(repo: R, notifier: N, config: MatchConfig) -> Self {
        Self {
            repo,
            notifier,
            config,
        }
    }

    /// Current state of a group. Used by callers that must re-derive an
    /// actor's role before dispatching an action.
    pub async fn snapshot(&self, group_id: Uuid) -> NestmateResult<GroupSnapshot> {
        self.repo.load(group_id).await
    }

    /// Create the initial two-person request.
    ///
    /// The degenerate case: one confirmed member (the requester), one
    /// invitation with no approval holds. Mirror requests between the same
    /// pair are rejected — checked here for the friendly error, enforced by
    /// the store's unique request key against races.
    pub async fn create_initial_request(
        &self,
        input: CreateMatchGroup,
    ) -> NestmateResult<MatchGroup> {
        if input.requested_by == input.target_id {
            return Err(MatchError::SelfRequest.into());
        }

        if self
            .repo
            .find_open_request_between(input.requested_by, input.target_id)
            .await?
            .is_some()
        {
            return Err(MatchError::DuplicateRequest.into());
        }

        let requested_by = input.requested_by;
        let target_id = input.target_id;
        let group = self.repo.create_request(input).await?;

        debug!(group_id = %group.id, %requested_by, %target_id, "initial request created");
        self.emit(MatchEvent::RequestCreated {
            group_id: group.id,
            requested_by,
            target_id,
        })
        .await;

        Ok(group)
    }

    /// Invite a user into an existing group.
    ///
    /// Every confirmed member except the inviter must approve before the
    /// invitee can join; one approval hold per such member is created
    /// together with the invitation.
    pub async fn invite_member(
        &self,
        group_id: Uuid,
        inviter_id: Uuid,
        target_id: Uuid,
    ) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;

        if !snap.is_member(inviter_id) {
            return Err(MatchError::NotAMember.into());
        }
        if snap.is_member(target_id) || snap.invitation_for(target_id).is_some() {
            return Err(MatchError::AlreadyMember.into());
        }
        if snap.members.len() + snap.invitations.len() >= self.config.max_members {
            return Err(MatchError::GroupFull.into());
        }

        let approvers: Vec<Uuid> = snap
            .members
            .iter()
            .copied()
            .filter(|m| *m != inviter_id)
            .collect();

        self.repo
            .add_invitation(group_id, target_id, inviter_id, &approvers)
            .await?;

        debug!(%group_id, %inviter_id, %target_id, approvers = approvers.len(), "member invited");
        self.emit(MatchEvent::InvitationCreated {
            group_id,
            invited_by: inviter_id,
            invitee_id: target_id,
            approvers,
        })
        .await;

        Ok(())
    }

    /// Record the invitee's acceptance. If no approvals are outstanding the
    /// member is confirmed immediately.
    pub async fn accept_invitation(&self, group_id: Uuid, invitee_id: Uuid) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;
        if snap.invitation_for(invitee_id).is_none() {
            return Err(MatchError::NotInvited.into());
        }

        self.repo
            .mark_invitation_accepted(group_id, invitee_id)
            .await?;

        self.emit(MatchEvent::InvitationAccepted {
            group_id,
            invitee_id,
        })
        .await;

        self.try_confirm(group_id, invitee_id).await
    }

    /// Record one confirmed member's approval of a pending member. When the
    /// last hold clears and the invitee has accepted, the member is
    /// confirmed in the same call.
    pub async fn approve_pending_member(
        &self,
        group_id: Uuid,
        approver_id: Uuid,
        pending_id: Uuid,
    ) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;

        if !snap.is_member(approver_id) {
            return Err(MatchError::NotAMember.into());
        }
        if snap.invitation_for(pending_id).is_none() {
            return Err(NestmateError::NotFound {
                entity: "invitation".into(),
                id: pending_id.to_string(),
            });
        }
        if !snap.needs_approval_from(pending_id).contains(&approver_id) {
            return Err(MatchError::NotAnApprover.into());
        }

        // Atomic: the hold row is deleted or the call conflicts.
        let remaining = self
            .repo
            .clear_approval(group_id, pending_id, approver_id)
            .await?;

        debug!(%group_id, %approver_id, %pending_id, remaining, "member approved");
        self.emit(MatchEvent::MemberApproved {
            group_id,
            pending_id,
            approver_id,
        })
        .await;

        if remaining == 0 {
            return self.try_confirm(group_id, pending_id).await;
        }
        Ok(())
    }

    /// Move a pending member into the confirmed set. Fails with `Conflict`
    /// if the admission condition does not hold or the id is no longer
    /// pending — never silently and never twice.
    pub async fn confirm_pending_member(
        &self,
        group_id: Uuid,
        pending_id: Uuid,
    ) -> NestmateResult<()> {
        self.repo.promote_member(group_id, pending_id).await?;

        debug!(%group_id, member_id = %pending_id, "pending member confirmed");
        self.emit(MatchEvent::MemberConfirmed {
            group_id,
            member_id: pending_id,
        })
        .await;

        Ok(())
    }

    /// Settle the degenerate two-person request directly, bypassing the
    /// multi-party negotiation: the sole invitee is accepted and promoted
    /// in one step.
    pub async fn confirm_degenerate_request(&self, group_id: Uuid) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;
        if !snap.is_degenerate_request() {
            return Err(MatchError::NotARequest.into());
        }
        let invitee_id = snap.invitations[0].invitee_id;

        // Claim the request against the snapshot version first: a rival
        // accept or a concurrent decline bumps the version and this write
        // conflicts instead of settling the group twice.
        self.repo
            .set_status(group_id, GroupStatus::Confirmed, snap.group.version)
            .await?;

        self.repo
            .mark_invitation_accepted(group_id, invitee_id)
            .await?;
        self.confirm_pending_member(group_id, invitee_id).await
    }

    /// Remove a confirmed member from the group. The group row survives
    /// even when the last member leaves.
    pub async fn remove_member(&self, group_id: Uuid, member_id: Uuid) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;
        if !snap.is_member(member_id) {
            return Err(MatchError::NotAMember.into());
        }

        self.repo.remove_member(group_id, member_id).await?;

        debug!(%group_id, %member_id, "member removed");
        self.emit(MatchEvent::MemberRemoved {
            group_id,
            member_id,
        })
        .await;

        Ok(())
    }

    /// Decline an unconfirmed request: the group row and all negotiation
    /// rows are deleted. Irreversible.
    pub async fn decline_request(&self, group_id: Uuid) -> NestmateResult<()> {
        self.delete_request(group_id).await?;
        self.emit(MatchEvent::RequestDeclined { group_id }).await;
        Ok(())
    }

    /// Withdraw an unconfirmed request (requester side of decline).
    pub async fn withdraw_request(&self, group_id: Uuid) -> NestmateResult<()> {
        self.delete_request(group_id).await?;
        self.emit(MatchEvent::RequestWithdrawn { group_id }).await;
        Ok(())
    }

    /// The settled group the user belongs to, if any.
    pub async fn find_active_group_for_user(
        &self,
        user_id: Uuid,
    ) -> NestmateResult<Option<GroupSnapshot>> {
        self.repo.find_active_group_for_user(user_id).await
    }

    /// Project every group the user touches into per-viewer records,
    /// ordered by last activity (newest first) and partitioned by bucket.
    pub async fn views_for_user(&self, user_id: Uuid) -> NestmateResult<UserViews> {
        let snapshots = self.repo.groups_for_user(user_id).await?;

        let mut records: Vec<ViewRecord> = snapshots
            .iter()
            .flat_map(|snap| projection::project(snap, user_id))
            .collect();
        records.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        let mut views = UserViews::default();
        for record in records {
            match record.bucket {
                ViewBucket::Active => views.active.push(record),
                ViewBucket::Awaiting => views.awaiting.push(record),
                ViewBucket::Sent => views.sent.push(record),
            }
        }
        Ok(views)
    }

    /// Confirm `pending_id` if the admission condition holds. A `Conflict`
    /// here means another actor's call already promoted (or removed) the
    /// member in the window since our approve/accept committed — that is
    /// the protocol working, not an error for this caller.
    async fn try_confirm(&self, group_id: Uuid, pending_id: Uuid) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;
        if !snap.is_admittable(pending_id) {
            return Ok(());
        }
        match self.confirm_pending_member(group_id, pending_id).await {
            Ok(()) => Ok(()),
            Err(NestmateError::Conflict { message }) => {
                debug!(%group_id, %pending_id, message, "auto-confirm lost the race");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_request(&self, group_id: Uuid) -> NestmateResult<()> {
        let snap = self.repo.load(group_id).await?;
        if snap.group.status.is_settled() {
            return Err(MatchError::NotARequest.into());
        }
        self.repo.delete_group(group_id).await
    }

    /// Notification failures are logged, never propagated: the mutation has
    /// already committed.
    async fn emit(&self, event: MatchEvent) {
        if let Err(e) = self.notifier.notify(event).await {
            warn!(error = %e, "notification delivery failed");
        }
    }
}
