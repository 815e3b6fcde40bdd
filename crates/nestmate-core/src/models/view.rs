//! View-projection output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which list a match record is presented under for a given viewer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViewBucket {
    /// Settled group the viewer belongs to.
    Active,
    /// The viewer owes an action (accept or approve).
    Awaiting,
    /// The viewer initiated something and is waiting on others.
    Sent,
}

/// Why a record landed in its bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViewReason {
    /// Someone asked the viewer to form a group; acceptance pending.
    InitialRequestReceived,
    /// The viewer's initial request awaits the other party.
    InitialRequestSent,
    /// The viewer was invited into an existing group and must accept.
    InvitationToAccept,
    /// A new member needs the viewer's approval.
    MemberToApprove,
    /// The viewer invited someone; acceptance or approvals outstanding.
    InvitationOutstanding,
    /// Fully formed group.
    GroupSettled,
}

/// One presentation record for `(group, viewer)`. A single group can yield
/// several records for the same viewer — one per pending member the viewer
/// must act on — so records carry the pending id they refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRecord {
    pub group_id: Uuid,
    pub bucket: ViewBucket,
    pub reason: ViewReason,
    pub pending_member_id: Option<Uuid>,
    /// Group `updated_at` at projection time; views across groups are
    /// ordered by this, newest first.
    pub last_activity: DateTime<Utc>,
}

/// All of a user's match views, partitioned by bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserViews {
    pub active: Vec<ViewRecord>,
    pub awaiting: Vec<ViewRecord>,
    pub sent: Vec<ViewRecord>,
}
