//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — match groups and their normalized negotiation rows
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Match groups
-- =======================================================================
DEFINE TABLE match_group SCHEMAFULL;
DEFINE FIELD status ON TABLE match_group TYPE string \
    ASSERT $value IN ['Requested', 'Confirmed', 'Active'];
DEFINE FIELD property_id ON TABLE match_group TYPE option<string>;
DEFINE FIELD requested_by ON TABLE match_group TYPE string;
DEFINE FIELD group_name ON TABLE match_group TYPE string;
DEFINE FIELD move_in_date ON TABLE match_group TYPE option<string>;
DEFINE FIELD message ON TABLE match_group TYPE string;
-- Pair key ('<min_uuid>:<max_uuid>') present only while an initial request
-- is open; the unique index collapses mirror requests between a pair.
DEFINE FIELD request_key ON TABLE match_group TYPE option<string>;
DEFINE FIELD version ON TABLE match_group TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE match_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE match_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_request_key ON TABLE match_group \
    COLUMNS request_key UNIQUE;

-- =======================================================================
-- Confirmed members (one row per member)
-- =======================================================================
DEFINE TABLE group_member SCHEMAFULL;
DEFINE FIELD group_id ON TABLE group_member TYPE string;
DEFINE FIELD member_id ON TABLE group_member TYPE string;
DEFINE FIELD joined_at ON TABLE group_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_group_user ON TABLE group_member \
    COLUMNS group_id, member_id UNIQUE;
DEFINE INDEX idx_member_user ON TABLE group_member COLUMNS member_id;

-- =======================================================================
-- Invitations (one row per pending member; the row is the negotiation
-- entry — deleting it confirms or cancels the pending member)
-- =======================================================================
DEFINE TABLE invitation SCHEMAFULL;
DEFINE FIELD group_id ON TABLE invitation TYPE string;
DEFINE FIELD invitee_id ON TABLE invitation TYPE string;
DEFINE FIELD invited_by ON TABLE invitation TYPE string;
DEFINE FIELD accepted ON TABLE invitation TYPE bool DEFAULT false;
DEFINE FIELD invited_at ON TABLE invitation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invitation_group_invitee ON TABLE invitation \
    COLUMNS group_id, invitee_id UNIQUE;
DEFINE INDEX idx_invitation_invitee ON TABLE invitation \
    COLUMNS invitee_id;

-- =======================================================================
-- Approval holds (one row per outstanding approval; deleted on approve,
-- so the required-approver set can only shrink)
-- =======================================================================
DEFINE TABLE approval_hold SCHEMAFULL;
DEFINE FIELD group_id ON TABLE approval_hold TYPE string;
DEFINE FIELD pending_id ON TABLE approval_hold TYPE string;
DEFINE FIELD approver_id ON TABLE approval_hold TYPE string;
DEFINE FIELD created_at ON TABLE approval_hold TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_hold_triple ON TABLE approval_hold \
    COLUMNS group_id, pending_id, approver_id UNIQUE;
DEFINE INDEX idx_hold_group_pending ON TABLE approval_hold \
    COLUMNS group_id, pending_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Query(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query("CREATE _migration SET version = $version, name = $name")
                .bind(("version", migration.version))
                .bind(("name", migration.name))
                .await?
                .check()
                .map_err(|e| {
                    DbError::Query(format!(
                        "Failed to record migration v{}: {}",
                        migration.version, e,
                    ))
                })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_all_tables() {
        for table in ["match_group", "group_member", "invitation", "approval_hold"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
