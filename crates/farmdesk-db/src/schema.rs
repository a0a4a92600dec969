//! Farmdesk table definitions and the versioned migration runner.
//!
//! Every table is SCHEMAFULL. Ids are UUID strings; role and outcome
//! enums are strings guarded by `ASSERT ... IN [...]`.

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
// v1: tenants, organizations, users, farmers
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD metadata ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Organizations (scoped to tenant)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE organization TYPE string;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD metadata ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_tenant_slug ON TABLE organization \
    COLUMNS tenant_id, slug UNIQUE;

-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Admin', 'User'];
DEFINE FIELD email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD banned ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD ban_reason ON TABLE user TYPE option<string>;
DEFINE FIELD ban_expires ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD impersonated_by ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session COLUMNS user_id;

-- =======================================================================
-- Verification tokens (password reset)
-- =======================================================================
DEFINE TABLE verification SCHEMAFULL;
DEFINE FIELD user_id ON TABLE verification TYPE string;
DEFINE FIELD token_hash ON TABLE verification TYPE string;
DEFINE FIELD expires_at ON TABLE verification TYPE datetime;
DEFINE FIELD created_at ON TABLE verification TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_verification_token ON TABLE verification \
    COLUMNS token_hash UNIQUE;

-- =======================================================================
-- Farmer groups (organization scope)
-- =======================================================================
DEFINE TABLE farmer_group SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE farmer_group TYPE string;
DEFINE FIELD name ON TABLE farmer_group TYPE string;
DEFINE FIELD slug ON TABLE farmer_group TYPE string;
DEFINE FIELD description ON TABLE farmer_group TYPE string;
DEFINE FIELD created_at ON TABLE farmer_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE farmer_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_farmer_group_org_slug ON TABLE farmer_group \
    COLUMNS organization_id, slug UNIQUE;

-- =======================================================================
-- Farmers (organization scope)
-- =======================================================================
DEFINE TABLE farmer SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE farmer TYPE string;
DEFINE FIELD full_name ON TABLE farmer TYPE string;
DEFINE FIELD phone ON TABLE farmer TYPE option<string>;
DEFINE FIELD village ON TABLE farmer TYPE option<string>;
DEFINE FIELD group_id ON TABLE farmer TYPE option<string>;
DEFINE FIELD metadata ON TABLE farmer TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE farmer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE farmer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_farmer_org ON TABLE farmer COLUMNS organization_id;
DEFINE INDEX idx_farmer_org_group ON TABLE farmer \
    COLUMNS organization_id, group_id;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD organization_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD target_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD ip_address ON TABLE audit_log TYPE option<string>;
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;
DEFINE INDEX idx_audit_org ON TABLE audit_log COLUMNS organization_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Organization membership
DEFINE TABLE member_of TYPE RELATION FROM user TO organization SCHEMAFULL;
DEFINE FIELD role ON TABLE member_of TYPE string \
    ASSERT $value IN ['Owner', 'Admin', 'Member'];
DEFINE FIELD created_at ON TABLE member_of TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_of_pair ON TABLE member_of COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client and
/// return how many were applied.
///
/// A `_migration` table records each applied version, so calling this
/// on an up-to-date database is a no-op.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<usize, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version, name FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();

    for migration in &pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying schema migration"
        );

        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}': {e}",
                migration.version, migration.name
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "recording v{}: {e}",
                    migration.version
                ))
            })?;
    }

    if pending.is_empty() {
        info!(version = current_version, "Schema is up to date");
    }

    Ok(pending.len())
}

/// DDL applied by the first migration.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "tenant",
            "organization",
            "user",
            "session",
            "verification",
            "farmer_group",
            "farmer",
            "audit_log",
            "member_of",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} ")),
                "missing table {table}"
            );
        }
    }
}
