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
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD subdomain ON TABLE tenant TYPE string;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Pending'];
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_subdomain ON TABLE tenant \
    COLUMNS subdomain UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Visitor', 'Member', 'Administrator'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;

-- =======================================================================
-- Ideas (tenant scope)
-- =======================================================================
DEFINE TABLE idea SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE idea TYPE string;
DEFINE FIELD number ON TABLE idea TYPE int ASSERT $value > 0;
DEFINE FIELD title ON TABLE idea TYPE string;
DEFINE FIELD slug ON TABLE idea TYPE string;
DEFINE FIELD description ON TABLE idea TYPE string;
DEFINE FIELD status ON TABLE idea TYPE string \
    ASSERT $value IN ['Open', 'Planned', 'Started', 'Completed', \
    'Declined'];
DEFINE FIELD user_id ON TABLE idea TYPE string;
DEFINE FIELD supporters ON TABLE idea TYPE int DEFAULT 0;
DEFINE FIELD response ON TABLE idea TYPE option<string>;
DEFINE FIELD response_user_id ON TABLE idea TYPE option<string>;
DEFINE FIELD responded_at ON TABLE idea TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE idea TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE idea TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_idea_tenant_number ON TABLE idea \
    COLUMNS tenant_id, number UNIQUE;
DEFINE INDEX idx_idea_tenant_slug ON TABLE idea \
    COLUMNS tenant_id, slug UNIQUE;

-- =======================================================================
-- Comments (tenant scope, per idea)
-- =======================================================================
DEFINE TABLE comment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE comment TYPE string;
DEFINE FIELD idea_id ON TABLE comment TYPE string;
DEFINE FIELD user_id ON TABLE comment TYPE string;
DEFINE FIELD content ON TABLE comment TYPE string;
DEFINE FIELD created_at ON TABLE comment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_comment_idea ON TABLE comment \
    COLUMNS tenant_id, idea_id;

-- =======================================================================
-- Supporters (tenant scope). Record key is `<idea_id>_<user_id>`, so
-- each (idea, user) pair exists at most once.
-- =======================================================================
DEFINE TABLE supporter SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE supporter TYPE string;
DEFINE FIELD idea_id ON TABLE supporter TYPE string;
DEFINE FIELD user_id ON TABLE supporter TYPE string;
DEFINE FIELD created_at ON TABLE supporter TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_supporter_idea ON TABLE supporter \
    COLUMNS idea_id;
DEFINE INDEX idx_supporter_tenant_user ON TABLE supporter \
    COLUMNS tenant_id, user_id;

-- =======================================================================
-- Tags (tenant scope)
-- =======================================================================
DEFINE TABLE tag SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE tag TYPE string;
DEFINE FIELD name ON TABLE tag TYPE string;
DEFINE FIELD slug ON TABLE tag TYPE string;
DEFINE FIELD color ON TABLE tag TYPE string;
DEFINE FIELD is_public ON TABLE tag TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE tag TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tag_tenant_slug ON TABLE tag \
    COLUMNS tenant_id, slug UNIQUE;

-- =======================================================================
-- Tag assignments (tenant scope). Record key is `<tag_id>_<idea_id>`.
-- =======================================================================
DEFINE TABLE idea_tag SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE idea_tag TYPE string;
DEFINE FIELD tag_id ON TABLE idea_tag TYPE string;
DEFINE FIELD idea_id ON TABLE idea_tag TYPE string;
DEFINE FIELD user_id ON TABLE idea_tag TYPE string;
DEFINE FIELD created_at ON TABLE idea_tag TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_idea_tag_idea ON TABLE idea_tag \
    COLUMNS tenant_id, idea_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates the `_migration` tracking table on first run, then applies
/// every migration newer than the recorded version. Running it again on
/// an up-to-date database is a no-op.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current_version = current_version(db).await?;
    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version);

    for migration in pending {
        apply(db, migration).await?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for tests that inspect the schema without a database.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    info!(
        version = migration.version,
        name = migration.name,
        "Applying migration"
    );

    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
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
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;

    info!(version = migration.version, "Migration applied");
    Ok(())
}
