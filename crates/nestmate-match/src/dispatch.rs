//! Approval-action dispatch.
//!
//! A user tapping "approve" may be a pending invitee accepting their own
//! invitation or a confirmed member approving someone else's. The role is
//! re-derived from current store state, never from whatever the caller's UI
//! believed when the button was rendered.

use nestmate_core::error::NestmateResult;
use nestmate_core::notify::Notifier;
use nestmate_core::repository::MatchGroupRepository;
use uuid::Uuid;

use crate::error::MatchError;
use crate::lifecycle::GroupLifecycleService;

/// Resolve the actor's current role in the group and dispatch to
/// `accept_invitation` or `approve_pending_member`.
///
/// `target_pending` names the pending member an approval applies to; it may
/// be omitted when the actor owes exactly one approval, but is required
/// when several are outstanding.
pub async fn dispatch_approval<R, N>(
    service: &GroupLifecycleService<R, N>,
    group_id: Uuid,
    actor_id: Uuid,
    target_pending: Option<Uuid>,
) -> NestmateResult<()>
where
    R: MatchGroupRepository,
    N: Notifier,
{
    let snap = service.snapshot(group_id).await?;

    if snap.invitation_for(actor_id).is_some() {
        return service.accept_invitation(group_id, actor_id).await;
    }

    if !snap.is_member(actor_id) {
        return Err(MatchError::NotAMember.into());
    }

    let pending_id = match target_pending {
        Some(id) => id,
        None => {
            let mut owed = snap
                .invitations
                .iter()
                .map(|inv| inv.invitee_id)
                .filter(|pending| snap.needs_approval_from(*pending).contains(&actor_id));
            match (owed.next(), owed.next()) {
                (Some(only), None) => only,
                (Some(_), Some(_)) => return Err(MatchError::AmbiguousAction.into()),
                (None, _) => return Err(MatchError::NotAnApprover.into()),
            }
        }
    };

    service
        .approve_pending_member(group_id, actor_id, pending_id)
        .await
}
