//! Integration tests for the match-group repository using in-memory
//! SurrealDB.

use nestmate_core::models::group::{CreateMatchGroup, GroupStatus};
use nestmate_core::repository::MatchGroupRepository;
use nestmate_core::NestmateError;
use nestmate_db::repository::SurrealMatchGroupRepository;
use surrealdb::engine::local::Mem;
use surrealdb::Surreal;
use uuid::Uuid;

/// Spin up an in-memory DB with migrations applied.
async fn setup() -> SurrealMatchGroupRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    nestmate_db::run_migrations(&db).await.unwrap();
    SurrealMatchGroupRepository::new(db)
}

fn request(requester: Uuid, target: Uuid) -> CreateMatchGroup {
    CreateMatchGroup {
        requested_by: requester,
        target_id: target,
        property_id: None,
        group_name: "Maple St flat".into(),
        move_in_date: None,
        message: "Let's share a place".into(),
    }
}

#[tokio::test]
async fn create_request_produces_degenerate_group() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    assert_eq!(group.status, GroupStatus::Requested);
    assert_eq!(group.requested_by, a);
    assert_eq!(group.version, 1);

    let snap = repo.load(group.id).await.unwrap();
    assert!(snap.is_degenerate_request());
    assert_eq!(snap.members, vec![a]);
    assert_eq!(snap.invitations.len(), 1);
    assert_eq!(snap.invitations[0].invitee_id, b);
    assert!(!snap.invitations[0].accepted);
    assert!(snap.holds.is_empty());
    snap.check_invariants().unwrap();
}

#[tokio::test]
async fn mirror_request_is_rejected() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    repo.create_request(request(a, b)).await.unwrap();

    // Same pair, reversed direction: the unique request key collapses it.
    let result = repo.create_request(request(b, a)).await;
    assert!(
        matches!(result, Err(NestmateError::Conflict { .. })),
        "mirror request should conflict, got {result:?}"
    );

    let open = repo.find_open_request_between(b, a).await.unwrap();
    assert!(open.is_some());
}

#[tokio::test]
async fn add_invitation_creates_holds() {
    let repo = setup().await;
    let (a, b, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();

    // A invites D; B must approve.
    repo.add_invitation(group.id, d, a, &[b]).await.unwrap();

    let snap = repo.load(group.id).await.unwrap();
    assert_eq!(snap.pending_member_ids().len(), 1);
    assert_eq!(
        snap.needs_approval_from(d).into_iter().collect::<Vec<_>>(),
        vec![b]
    );
    snap.check_invariants().unwrap();

    // Second invitation for the same user conflicts.
    let dup = repo.add_invitation(group.id, d, b, &[a]).await;
    assert!(matches!(dup, Err(NestmateError::Conflict { .. })));
}

#[tokio::test]
async fn clear_approval_is_atomic_and_counts_down() {
    let repo = setup().await;
    let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();
    repo.add_invitation(group.id, c, a, &[b]).await.unwrap();
    repo.mark_invitation_accepted(group.id, c).await.unwrap();
    repo.clear_approval(group.id, c, b).await.unwrap();
    repo.promote_member(group.id, c).await.unwrap();

    repo.add_invitation(group.id, d, a, &[b, c]).await.unwrap();

    let remaining = repo.clear_approval(group.id, d, b).await.unwrap();
    assert_eq!(remaining, 1);

    // Approving twice is a conflict, not a silent no-op.
    let again = repo.clear_approval(group.id, d, b).await;
    assert!(matches!(again, Err(NestmateError::Conflict { .. })));

    let remaining = repo.clear_approval(group.id, d, c).await.unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn snapshot_orders_members_by_join_time() {
    let repo = setup().await;
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();
    repo.add_invitation(group.id, c, a, &[b]).await.unwrap();
    repo.mark_invitation_accepted(group.id, c).await.unwrap();
    repo.clear_approval(group.id, c, b).await.unwrap();
    repo.promote_member(group.id, c).await.unwrap();

    let snap = repo.load(group.id).await.unwrap();
    assert_eq!(snap.members, vec![a, b, c]);
}

#[tokio::test]
async fn rejected_writes_leave_group_untouched() {
    let repo = setup().await;
    let (a, b, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();
    repo.add_invitation(group.id, d, a, &[b]).await.unwrap();
    repo.mark_invitation_accepted(group.id, d).await.unwrap();
    repo.clear_approval(group.id, d, b).await.unwrap();

    let before = repo.load(group.id).await.unwrap().group;

    // Double approve is rejected without bumping the group row.
    let again = repo.clear_approval(group.id, d, b).await;
    assert!(matches!(again, Err(NestmateError::Conflict { .. })));

    // Accepting a non-existent invitation is rejected the same way.
    let missing = repo.mark_invitation_accepted(group.id, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(NestmateError::NotFound { .. })));

    let after = repo.load(group.id).await.unwrap().group;
    assert_eq!(after.version, before.version);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn promote_requires_acceptance_and_no_holds() {
    let repo = setup().await;
    let (a, b, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();
    repo.add_invitation(group.id, d, a, &[b]).await.unwrap();

    // Not accepted yet.
    let early = repo.promote_member(group.id, d).await;
    assert!(matches!(early, Err(NestmateError::Conflict { .. })));

    // Accepted but a hold remains.
    repo.mark_invitation_accepted(group.id, d).await.unwrap();
    let held = repo.promote_member(group.id, d).await;
    assert!(matches!(held, Err(NestmateError::Conflict { .. })));

    repo.clear_approval(group.id, d, b).await.unwrap();
    repo.promote_member(group.id, d).await.unwrap();

    let snap = repo.load(group.id).await.unwrap();
    assert!(snap.is_member(d));
    assert!(snap.invitations.is_empty());
    snap.check_invariants().unwrap();

    // Promoting an already-confirmed member errors; it never duplicates.
    let twice = repo.promote_member(group.id, d).await;
    assert!(matches!(twice, Err(NestmateError::Conflict { .. })));
    let snap = repo.load(group.id).await.unwrap();
    assert_eq!(snap.members.iter().filter(|m| **m == d).count(), 1);
}

#[tokio::test]
async fn set_status_rejects_stale_version() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();

    let updated = repo
        .set_status(group.id, GroupStatus::Confirmed, group.version)
        .await
        .unwrap();
    assert_eq!(updated.status, GroupStatus::Confirmed);
    assert_eq!(updated.version, group.version + 1);

    // Writing with the old version must conflict.
    let stale = repo
        .set_status(group.id, GroupStatus::Requested, group.version)
        .await;
    assert!(matches!(stale, Err(NestmateError::Conflict { .. })));
}

#[tokio::test]
async fn remove_member_and_unknown_member() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();

    repo.remove_member(group.id, b).await.unwrap();
    let snap = repo.load(group.id).await.unwrap();
    assert!(!snap.is_member(b));

    let missing = repo.remove_member(group.id, b).await;
    assert!(matches!(missing, Err(NestmateError::NotFound { .. })));
}

#[tokio::test]
async fn delete_group_cascades() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.delete_group(group.id).await.unwrap();

    let gone = repo.load(group.id).await;
    assert!(matches!(gone, Err(NestmateError::NotFound { .. })));

    // Child rows went with it: neither user touches any group now.
    assert!(repo.groups_for_user(a).await.unwrap().is_empty());
    assert!(repo.groups_for_user(b).await.unwrap().is_empty());

    // The pair can request again after deletion.
    repo.create_request(request(b, a)).await.unwrap();
}

#[tokio::test]
async fn find_active_group_skips_open_requests() {
    let repo = setup().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    assert!(repo.find_active_group_for_user(a).await.unwrap().is_none());

    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();

    let found = repo.find_active_group_for_user(a).await.unwrap().unwrap();
    assert_eq!(found.group.id, group.id);
    assert_eq!(found.group.status, GroupStatus::Confirmed);
    assert!(found.is_member(b));
}

#[tokio::test]
async fn groups_for_user_covers_member_and_invitee_roles() {
    let repo = setup().await;
    let (a, b, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let group = repo.create_request(request(a, b)).await.unwrap();
    repo.mark_invitation_accepted(group.id, b).await.unwrap();
    repo.promote_member(group.id, b).await.unwrap();
    repo.add_invitation(group.id, d, a, &[b]).await.unwrap();

    for user in [a, b, d] {
        let groups = repo.groups_for_user(user).await.unwrap();
        assert_eq!(groups.len(), 1, "user {user} should see the group");
        assert_eq!(groups[0].group.id, group.id);
    }
}
