//! SurrealDB implementation of [`MatchGroupRepository`].
//!
//! Negotiation state is normalized: invitations and approval holds are
//! individual rows, so accept/approve are single guarded statements and
//! member promotion is one transaction. Guard failures surface as
//! [`DbError::Conflict`] rather than silently losing updates.

use chrono::{DateTime, NaiveDate, Utc};
use nestmate_core::error::NestmateResult;
use nestmate_core::models::group::{
    CreateMatchGroup, GroupSnapshot, GroupStatus, MatchGroup, request_key,
};
use nestmate_core::models::invitation::{ApprovalHold, Invitation};
use nestmate_core::repository::MatchGroupRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    record_id: String,
    status: String,
    property_id: Option<String>,
    requested_by: String,
    group_name: String,
    move_in_date: Option<String>,
    message: String,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row struct for statements whose default return carries no `record_id`
/// projection (the caller already knows the UUID).
#[derive(Debug, SurrealValue)]
struct GroupFieldsRow {
    status: String,
    property_id: Option<String>,
    requested_by: String,
    group_name: String,
    move_in_date: Option<String>,
    message: String,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MemberRow {
    member_id: String,
}

#[derive(Debug, SurrealValue)]
struct InvitationRow {
    group_id: String,
    invitee_id: String,
    invited_by: String,
    accepted: bool,
    invited_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct HoldRow {
    group_id: String,
    pending_id: String,
    approver_id: String,
    created_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Query(format!("invalid {what} UUID: {e}")))
}

fn parse_status(s: &str) -> Result<GroupStatus, DbError> {
    match s {
        "Requested" => Ok(GroupStatus::Requested),
        "Confirmed" => Ok(GroupStatus::Confirmed),
        "Active" => Ok(GroupStatus::Active),
        other => Err(DbError::Query(format!("unknown group status: {other}"))),
    }
}

fn render_status(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::Requested => "Requested",
        GroupStatus::Confirmed => "Confirmed",
        GroupStatus::Active => "Active",
    }
}

impl GroupRow {
    fn try_into_group(self) -> Result<MatchGroup, DbError> {
        let id = parse_uuid(&self.record_id, "group")?;
        GroupFieldsRow {
            status: self.status,
            property_id: self.property_id,
            requested_by: self.requested_by,
            group_name: self.group_name,
            move_in_date: self.move_in_date,
            message: self.message,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_group(id)
    }
}

impl GroupFieldsRow {
    fn try_into_group(self, id: Uuid) -> Result<MatchGroup, DbError> {
        let requested_by = parse_uuid(&self.requested_by, "requester")?;
        let property_id = self
            .property_id
            .as_deref()
            .map(|s| parse_uuid(s, "property"))
            .transpose()?;
        let move_in_date = self
            .move_in_date
            .as_deref()
            .map(|s| {
                s.parse::<NaiveDate>()
                    .map_err(|e| DbError::Query(format!("invalid move-in date: {e}")))
            })
            .transpose()?;
        Ok(MatchGroup {
            id,
            status: parse_status(&self.status)?,
            property_id,
            requested_by,
            group_name: self.group_name,
            move_in_date,
            message: self.message,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl InvitationRow {
    fn try_into_invitation(self) -> Result<Invitation, DbError> {
        Ok(Invitation {
            group_id: parse_uuid(&self.group_id, "group")?,
            invitee_id: parse_uuid(&self.invitee_id, "invitee")?,
            invited_by: parse_uuid(&self.invited_by, "inviter")?,
            accepted: self.accepted,
            invited_at: self.invited_at,
        })
    }
}

impl HoldRow {
    fn try_into_hold(self) -> Result<ApprovalHold, DbError> {
        Ok(ApprovalHold {
            group_id: parse_uuid(&self.group_id, "group")?,
            pending_id: parse_uuid(&self.pending_id, "pending member")?,
            approver_id: parse_uuid(&self.approver_id, "approver")?,
            created_at: self.created_at,
        })
    }
}

/// Collect per-statement errors from a response into one text blob.
///
/// Transaction failures report the generic "failed transaction" message on
/// most statements; the statement that actually THREW carries the marker
/// string, so guard mapping must look at every error, not just the first.
fn take_error_text(mut response: surrealdb::IndexedResults) -> Option<String> {
    let errors = response.take_errors();
    if errors.is_empty() {
        return None;
    }
    let mut messages: Vec<String> = errors.into_values().map(|e| e.to_string()).collect();
    messages.sort();
    Some(messages.join("; "))
}

/// Map a write error to `Conflict` when it stems from the named unique
/// index, otherwise pass it through as a database error.
fn conflict_on_index(err: surrealdb::Error, index: &str, message: &str) -> DbError {
    let text = err.to_string();
    if text.contains(index) || text.contains("already contains") {
        DbError::Conflict(message.into())
    } else {
        DbError::Surreal(err)
    }
}

/// SurrealDB implementation of the match-group repository.
#[derive(Clone)]
pub struct SurrealMatchGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMatchGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_group(&self, group_id: Uuid) -> Result<MatchGroup, DbError> {
        let id_str = group_id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('match_group', $id)",
            )
            .bind(("id", id_str.clone()))
            .await?;
        let rows: Vec<GroupRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "match_group".into(),
            id: id_str,
        })?;
        row.try_into_group()
    }

    async fn load_snapshot(&self, group_id: Uuid) -> Result<GroupSnapshot, DbError> {
        let group = self.get_group(group_id).await?;
        let id_str = group_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT member_id, joined_at FROM group_member \
                 WHERE group_id = $id ORDER BY joined_at ASC; \
                 SELECT * FROM invitation WHERE group_id = $id \
                 ORDER BY invited_at ASC; \
                 SELECT * FROM approval_hold WHERE group_id = $id;",
            )
            .bind(("id", id_str))
            .await?;

        let member_rows: Vec<MemberRow> = result.take(0)?;
        let invitation_rows: Vec<InvitationRow> = result.take(1)?;
        let hold_rows: Vec<HoldRow> = result.take(2)?;

        let members = member_rows
            .iter()
            .map(|m| parse_uuid(&m.member_id, "member"))
            .collect::<Result<Vec<_>, DbError>>()?;
        let invitations = invitation_rows
            .into_iter()
            .map(InvitationRow::try_into_invitation)
            .collect::<Result<Vec<_>, DbError>>()?;
        let holds = hold_rows
            .into_iter()
            .map(HoldRow::try_into_hold)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(GroupSnapshot {
            group,
            members,
            invitations,
            holds,
        })
    }

    /// Distinct group ids the user appears in, as member or invitee.
    async fn group_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let user_str = user_id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT group_id FROM group_member WHERE member_id = $user; \
                 SELECT * FROM invitation WHERE invitee_id = $user;",
            )
            .bind(("user", user_str))
            .await?;

        #[derive(Debug, SurrealValue)]
        struct MembershipRow {
            group_id: String,
        }

        let memberships: Vec<MembershipRow> = result.take(0)?;
        let invitations: Vec<InvitationRow> = result.take(1)?;

        let mut ids = Vec::new();
        for m in memberships {
            ids.push(parse_uuid(&m.group_id, "group")?);
        }
        for inv in invitations {
            ids.push(parse_uuid(&inv.group_id, "group")?);
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

impl<C: Connection> MatchGroupRepository for SurrealMatchGroupRepository<C> {
    async fn create_request(&self, input: CreateMatchGroup) -> NestmateResult<MatchGroup> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let key = request_key(input.requested_by, input.target_id);

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('match_group', $id) SET \
                     status = 'Requested', \
                     property_id = $property_id, \
                     requested_by = $requested_by, \
                     group_name = $group_name, \
                     move_in_date = $move_in_date, \
                     message = $message, \
                     request_key = $request_key, \
                     version = 1; \
                 CREATE group_member SET \
                     group_id = $id, member_id = $requested_by; \
                 CREATE invitation SET \
                     group_id = $id, invitee_id = $target_id, \
                     invited_by = $requested_by, accepted = false; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("property_id", input.property_id.map(|p| p.to_string())))
            .bind(("requested_by", input.requested_by.to_string()))
            .bind(("group_name", input.group_name))
            .bind(("move_in_date", input.move_in_date.map(|d| d.to_string())))
            .bind(("message", input.message))
            .bind(("target_id", input.target_id.to_string()))
            .bind(("request_key", key))
            .await
            .map_err(|e| {
                conflict_on_index(
                    e,
                    "idx_group_request_key",
                    "an open request between these users already exists",
                )
            })?
            .check()
            .map_err(|e| {
                conflict_on_index(
                    e,
                    "idx_group_request_key",
                    "an open request between these users already exists",
                )
            })?;

        Ok(self.get_group(id).await?)
    }

    async fn load(&self, group_id: Uuid) -> NestmateResult<GroupSnapshot> {
        Ok(self.load_snapshot(group_id).await?)
    }

    async fn find_open_request_between(&self, a: Uuid, b: Uuid) -> NestmateResult<Option<MatchGroup>> {
        let key = request_key(a, b);
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM match_group \
                 WHERE request_key = $key AND status = 'Requested'",
            )
            .bind(("key", key))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_group()?)),
            None => Ok(None),
        }
    }

    async fn find_active_group_for_user(&self, user_id: Uuid) -> NestmateResult<Option<GroupSnapshot>> {
        let user_str = user_id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM match_group \
                 WHERE status IN ['Confirmed', 'Active'] \
                 AND meta::id(id) IN (\
                     SELECT VALUE group_id FROM group_member \
                     WHERE member_id = $user\
                 ) \
                 ORDER BY updated_at DESC",
            )
            .bind(("user", user_str))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => {
                let group = row.try_into_group()?;
                Ok(Some(self.load_snapshot(group.id).await?))
            }
            None => Ok(None),
        }
    }

    async fn groups_for_user(&self, user_id: Uuid) -> NestmateResult<Vec<GroupSnapshot>> {
        let ids = self.group_ids_for_user(user_id).await?;
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            snapshots.push(self.load_snapshot(id).await?);
        }
        Ok(snapshots)
    }

    async fn add_invitation(
        &self,
        group_id: Uuid,
        invitee_id: Uuid,
        invited_by: Uuid,
        approvers: &[Uuid],
    ) -> NestmateResult<()> {
        let mut statements = vec![
            "BEGIN TRANSACTION;".to_string(),
            "CREATE invitation SET \
             group_id = $group_id, invitee_id = $invitee_id, \
             invited_by = $invited_by, accepted = false;"
                .to_string(),
        ];
        for i in 0..approvers.len() {
            statements.push(format!(
                "CREATE approval_hold SET \
                 group_id = $group_id, pending_id = $invitee_id, \
                 approver_id = $approver_{i};"
            ));
        }
        statements.push(
            "UPDATE type::record('match_group', $group_id) SET \
             updated_at = time::now(), version += 1;"
                .to_string(),
        );
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join(" "))
            .bind(("group_id", group_id.to_string()))
            .bind(("invitee_id", invitee_id.to_string()))
            .bind(("invited_by", invited_by.to_string()));
        for (i, approver) in approvers.iter().enumerate() {
            builder = builder.bind((format!("approver_{i}"), approver.to_string()));
        }

        builder
            .await
            .map_err(|e| {
                conflict_on_index(
                    e,
                    "idx_invitation_group_invitee",
                    "user already has an invitation in this group",
                )
            })?
            .check()
            .map_err(|e| {
                conflict_on_index(
                    e,
                    "idx_invitation_group_invitee",
                    "user already has an invitation in this group",
                )
            })?;

        Ok(())
    }

    async fn mark_invitation_accepted(&self, group_id: Uuid, invitee_id: Uuid) -> NestmateResult<()> {
        // The guard and the version bump share one transaction: a missing
        // invitation aborts the whole query and leaves the group row alone.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $inv = (UPDATE invitation SET accepted = true \
                     WHERE group_id = $group_id AND invitee_id = $invitee_id \
                     RETURN AFTER); \
                 IF array::len($inv) == 0 { THROW 'invitation_missing' }; \
                 UPDATE type::record('match_group', $group_id) SET \
                     updated_at = time::now(), version += 1; \
                 COMMIT TRANSACTION;",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("invitee_id", invitee_id.to_string()))
            .await;

        let map_guard = |text: String| -> DbError {
            if text.contains("invitation_missing") {
                DbError::NotFound {
                    entity: "invitation".into(),
                    id: invitee_id.to_string(),
                }
            } else {
                DbError::Query(text)
            }
        };

        match result {
            Ok(response) => match take_error_text(response) {
                None => Ok(()),
                Some(text) => Err(map_guard(text).into()),
            },
            Err(e) => Err(map_guard(e.to_string()).into()),
        }
    }

    async fn clear_approval(
        &self,
        group_id: Uuid,
        pending_id: Uuid,
        approver_id: Uuid,
    ) -> NestmateResult<u64> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $gone = (DELETE approval_hold \
                     WHERE group_id = $group_id AND pending_id = $pending_id \
                     AND approver_id = $approver_id \
                     RETURN BEFORE); \
                 IF array::len($gone) == 0 { THROW 'approval_missing' }; \
                 UPDATE type::record('match_group', $group_id) SET \
                     updated_at = time::now(), version += 1; \
                 COMMIT TRANSACTION;",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("pending_id", pending_id.to_string()))
            .bind(("approver_id", approver_id.to_string()))
            .await;

        let map_guard = |text: String| -> DbError {
            if text.contains("approval_missing") {
                // Approved twice, or the pending member was confirmed or
                // removed by another actor. Caller must re-fetch first.
                DbError::Conflict(format!(
                    "no outstanding approval by {approver_id} for {pending_id}"
                ))
            } else {
                DbError::Query(text)
            }
        };

        match result {
            Ok(response) => {
                if let Some(text) = take_error_text(response) {
                    return Err(map_guard(text).into());
                }
            }
            Err(e) => return Err(map_guard(e.to_string()).into()),
        }

        // Remaining holds for this pending member. The count is advisory:
        // confirmation re-loads the group before promoting.
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM approval_hold \
                 WHERE group_id = $group_id AND pending_id = $pending_id \
                 GROUP ALL",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("pending_id", pending_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(counts.first().map(|c| c.total).unwrap_or(0))
    }

    async fn promote_member(&self, group_id: Uuid, pending_id: Uuid) -> NestmateResult<()> {
        // Single transaction: the invitation delete doubles as the admission
        // guard, so two concurrent promotions cannot both succeed.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $inv = (DELETE invitation \
                     WHERE group_id = $group_id AND invitee_id = $pending_id \
                     AND accepted = true \
                     RETURN BEFORE); \
                 IF array::len($inv) == 0 { THROW 'not_admittable' }; \
                 LET $holds = (SELECT * FROM approval_hold \
                     WHERE group_id = $group_id AND pending_id = $pending_id); \
                 IF array::len($holds) > 0 { THROW 'approvals_outstanding' }; \
                 CREATE group_member SET \
                     group_id = $group_id, member_id = $pending_id; \
                 UPDATE type::record('match_group', $group_id) SET \
                     status = 'Confirmed', request_key = NONE, \
                     updated_at = time::now(), version += 1; \
                 COMMIT TRANSACTION;",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("pending_id", pending_id.to_string()))
            .await;

        let map_guard = |text: String| -> DbError {
            if text.contains("not_admittable") {
                DbError::Conflict(format!(
                    "{pending_id} is not an accepted pending member of {group_id}"
                ))
            } else if text.contains("approvals_outstanding") {
                DbError::Conflict(format!("approvals still outstanding for {pending_id}"))
            } else {
                DbError::Query(text)
            }
        };

        match result {
            Ok(response) => match take_error_text(response) {
                None => Ok(()),
                Some(text) => Err(map_guard(text).into()),
            },
            Err(e) => Err(map_guard(e.to_string()).into()),
        }
    }

    async fn set_status(
        &self,
        group_id: Uuid,
        status: GroupStatus,
        expected_version: u64,
    ) -> NestmateResult<MatchGroup> {
        let id_str = group_id.to_string();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('match_group', $id) SET \
                 status = $status, updated_at = time::now(), version += 1 \
                 WHERE version = $expected \
                 RETURN AFTER",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", render_status(status)))
            .bind(("expected", expected_version))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupFieldsRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.try_into_group(group_id)?),
            None => {
                // Stale version vs missing row: re-read to tell them apart.
                match self.get_group(group_id).await {
                    Ok(current) => Err(DbError::Conflict(format!(
                        "group {group_id} is at version {}, expected {expected_version}",
                        current.version
                    ))
                    .into()),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn remove_member(&self, group_id: Uuid, member_id: Uuid) -> NestmateResult<()> {
        let member_str = member_id.to_string();
        let mut result = self
            .db
            .query(
                "DELETE group_member \
                 WHERE group_id = $group_id AND member_id = $member_id \
                 RETURN BEFORE; \
                 UPDATE type::record('match_group', $group_id) SET \
                 updated_at = time::now(), version += 1;",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("member_id", member_str.clone()))
            .await
            .map_err(DbError::from)?;

        let deleted: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: "group_member".into(),
                id: member_str,
            }
            .into());
        }
        Ok(())
    }

    async fn delete_group(&self, group_id: Uuid) -> NestmateResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE approval_hold WHERE group_id = $id; \
                 DELETE invitation WHERE group_id = $id; \
                 DELETE group_member WHERE group_id = $id; \
                 DELETE type::record('match_group', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", group_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
