//! View projection — pure mapping from (group state, viewer) to tagged
//! presentation records.
//!
//! One group can yield several records for the same viewer: records are
//! enumerated per pending member, so a member asked to approve two invitees
//! sees two `Awaiting` entries. Callers order records across groups by
//! `last_activity` descending.

use nestmate_core::models::group::GroupSnapshot;
use nestmate_core::models::view::{ViewBucket, ViewReason, ViewRecord};
use uuid::Uuid;

/// Project one group for one viewer. Returns no records when the viewer has
/// no relationship to the group.
pub fn project(snap: &GroupSnapshot, viewer_id: Uuid) -> Vec<ViewRecord> {
    let mut records = Vec::new();
    let mut push = |bucket: ViewBucket, reason: ViewReason, pending: Option<Uuid>| {
        records.push(ViewRecord {
            group_id: snap.group.id,
            bucket,
            reason,
            pending_member_id: pending,
            last_activity: snap.group.updated_at,
        });
    };

    // The initial two-person request has no approval negotiation: the
    // invitee owes an acceptance, the requester waits.
    if snap.is_degenerate_request() {
        let invitation = &snap.invitations[0];
        if viewer_id == invitation.invitee_id {
            push(
                ViewBucket::Awaiting,
                ViewReason::InitialRequestReceived,
                Some(viewer_id),
            );
        } else if viewer_id == snap.group.requested_by {
            push(
                ViewBucket::Sent,
                ViewReason::InitialRequestSent,
                Some(invitation.invitee_id),
            );
        }
        return records;
    }

    // Pending invitee: must accept.
    if snap.invitation_for(viewer_id).is_some() {
        push(
            ViewBucket::Awaiting,
            ViewReason::InvitationToAccept,
            Some(viewer_id),
        );
    }

    if snap.is_member(viewer_id) {
        for invitation in &snap.invitations {
            let pending_id = invitation.invitee_id;
            if snap.needs_approval_from(pending_id).contains(&viewer_id) {
                // Confirmed member who still owes an approval.
                push(
                    ViewBucket::Awaiting,
                    ViewReason::MemberToApprove,
                    Some(pending_id),
                );
            } else if invitation.invited_by == viewer_id {
                // Inviter waiting on the invitee and/or the other members.
                push(
                    ViewBucket::Sent,
                    ViewReason::InvitationOutstanding,
                    Some(pending_id),
                );
            }
        }

        // Settled view: nothing pending and at least two members.
        if snap.invitations.is_empty() && snap.members.len() >= 2 {
            if snap.group.status.is_settled() {
                push(ViewBucket::Active, ViewReason::GroupSettled, None);
            } else if viewer_id == snap.group.requested_by {
                push(ViewBucket::Sent, ViewReason::InitialRequestSent, None);
            } else {
                push(
                    ViewBucket::Awaiting,
                    ViewReason::InitialRequestReceived,
                    None,
                );
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nestmate_core::models::group::{GroupStatus, MatchGroup};
    use nestmate_core::models::invitation::{ApprovalHold, Invitation};

    fn group(status: GroupStatus, requested_by: Uuid) -> MatchGroup {
        MatchGroup {
            id: Uuid::new_v4(),
            status,
            property_id: None,
            requested_by,
            group_name: "flat".into(),
            move_in_date: None,
            message: String::new(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invitation(group_id: Uuid, invitee: Uuid, inviter: Uuid, accepted: bool) -> Invitation {
        Invitation {
            group_id,
            invitee_id: invitee,
            invited_by: inviter,
            accepted,
            invited_at: Utc::now(),
        }
    }

    fn hold(group_id: Uuid, pending: Uuid, approver: Uuid) -> ApprovalHold {
        ApprovalHold {
            group_id,
            pending_id: pending,
            approver_id: approver,
            created_at: Utc::now(),
        }
    }

    fn degenerate(requester: Uuid, target: Uuid) -> GroupSnapshot {
        let g = group(GroupStatus::Requested, requester);
        let gid = g.id;
        GroupSnapshot {
            group: g,
            members: vec![requester],
            invitations: vec![invitation(gid, target, requester, false)],
            holds: vec![],
        }
    }

    #[test]
    fn degenerate_request_routes_by_role() {
        let requester = Uuid::new_v4();
        let target = Uuid::new_v4();
        let snap = degenerate(requester, target);

        let for_target = project(&snap, target);
        assert_eq!(for_target.len(), 1);
        assert_eq!(for_target[0].bucket, ViewBucket::Awaiting);
        assert_eq!(for_target[0].reason, ViewReason::InitialRequestReceived);

        let for_requester = project(&snap, requester);
        assert_eq!(for_requester.len(), 1);
        assert_eq!(for_requester[0].bucket, ViewBucket::Sent);
        assert_eq!(for_requester[0].reason, ViewReason::InitialRequestSent);

        let stranger = project(&snap, Uuid::new_v4());
        assert!(stranger.is_empty());
    }

    #[test]
    fn pending_invitee_sees_awaiting() {
        let [a, b, d] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let g = group(GroupStatus::Confirmed, a);
        let gid = g.id;
        let snap = GroupSnapshot {
            group: g,
            members: vec![a, b],
            invitations: vec![invitation(gid, d, a, false)],
            holds: vec![hold(gid, d, b)],
        };

        let records = project(&snap, d);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bucket, ViewBucket::Awaiting);
        assert_eq!(records[0].reason, ViewReason::InvitationToAccept);
        assert_eq!(records[0].pending_member_id, Some(d));
    }

    #[test]
    fn approving_member_sees_awaiting_per_pending() {
        let [a, b, d, e] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let g = group(GroupStatus::Confirmed, a);
        let gid = g.id;
        // A invited both D and E; B owes an approval for each.
        let snap = GroupSnapshot {
            group: g,
            members: vec![a, b],
            invitations: vec![invitation(gid, d, a, false), invitation(gid, e, a, true)],
            holds: vec![hold(gid, d, b), hold(gid, e, b)],
        };

        let records = project(&snap, b);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.bucket == ViewBucket::Awaiting
            && r.reason == ViewReason::MemberToApprove));
        let pendings: Vec<_> = records.iter().filter_map(|r| r.pending_member_id).collect();
        assert!(pendings.contains(&d));
        assert!(pendings.contains(&e));
    }

    #[test]
    fn inviter_sees_sent_while_outstanding() {
        let [a, b, d] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let g = group(GroupStatus::Confirmed, a);
        let gid = g.id;
        let snap = GroupSnapshot {
            group: g,
            members: vec![a, b],
            invitations: vec![invitation(gid, d, a, true)],
            holds: vec![hold(gid, d, b)],
        };

        let records = project(&snap, a);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bucket, ViewBucket::Sent);
        assert_eq!(records[0].reason, ViewReason::InvitationOutstanding);
        assert_eq!(records[0].pending_member_id, Some(d));
    }

    #[test]
    fn member_with_both_roles_gets_two_records() {
        let [a, b, d, e] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let g = group(GroupStatus::Confirmed, a);
        let gid = g.id;
        // B invited E (waiting) and owes an approval for A's invitee D.
        let snap = GroupSnapshot {
            group: g,
            members: vec![a, b],
            invitations: vec![invitation(gid, d, a, false), invitation(gid, e, b, false)],
            holds: vec![hold(gid, d, b), hold(gid, e, a)],
        };

        let records = project(&snap, b);
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.bucket == ViewBucket::Awaiting
            && r.pending_member_id == Some(d)));
        assert!(records.iter().any(|r| r.bucket == ViewBucket::Sent
            && r.pending_member_id == Some(e)));
    }

    #[test]
    fn settled_group_without_pending_is_active() {
        let [a, b] = [Uuid::new_v4(), Uuid::new_v4()];
        for status in [GroupStatus::Confirmed, GroupStatus::Active] {
            let snap = GroupSnapshot {
                group: group(status, a),
                members: vec![a, b],
                invitations: vec![],
                holds: vec![],
            };
            let records = project(&snap, b);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].bucket, ViewBucket::Active);
            assert_eq!(records[0].reason, ViewReason::GroupSettled);
        }
    }

    #[test]
    fn unsettled_group_without_pending_routes_by_requester_role() {
        let [a, b] = [Uuid::new_v4(), Uuid::new_v4()];
        let snap = GroupSnapshot {
            group: group(GroupStatus::Requested, a),
            members: vec![a, b],
            invitations: vec![],
            holds: vec![],
        };
        assert_eq!(project(&snap, a)[0].bucket, ViewBucket::Sent);
        assert_eq!(project(&snap, b)[0].bucket, ViewBucket::Awaiting);
    }

    #[test]
    fn stranger_sees_nothing() {
        let [a, b, d] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let g = group(GroupStatus::Confirmed, a);
        let gid = g.id;
        let snap = GroupSnapshot {
            group: g,
            members: vec![a, b],
            invitations: vec![invitation(gid, d, a, false)],
            holds: vec![hold(gid, d, b)],
        };
        assert!(project(&snap, Uuid::new_v4()).is_empty());
    }
}
