//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration is a SQL batch that
//! transforms the schema from version N-1 to N.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 3;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            debug!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        3 => apply_v3(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: attestations, the public aggregate and claims.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Private attestation records, one row per live record
        CREATE TABLE attestations (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id BLOB NOT NULL UNIQUE,   -- 32 bytes, random
            owner BLOB NOT NULL,              -- 32 bytes, Ed25519 public key
            artifact BLOB NOT NULL,           -- 32 bytes, reduced SHA-256
            quality INTEGER NOT NULL,         -- 0..=100
            methodology INTEGER NOT NULL,     -- Methodology code
            created_at INTEGER NOT NULL
        );

        -- Public aggregate per artifact
        CREATE TABLE aggregates (
            artifact BLOB PRIMARY KEY,
            score INTEGER NOT NULL DEFAULT 0,
            count INTEGER NOT NULL DEFAULT 0
        );

        -- Consumed claims; rows are never deleted
        CREATE TABLE claims (
            claim_key BLOB PRIMARY KEY,
            consumed_at INTEGER NOT NULL
        );

        CREATE INDEX idx_attestations_owner_artifact ON attestations(owner, artifact);
        "#,
    )?;

    Ok(())
}

/// Migration v2: credential vaults and delegation grants.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Vault entries; position is kept across rotation
        CREATE TABLE credentials (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id BLOB NOT NULL UNIQUE,   -- 32 bytes, changes on rotate
            owner BLOB NOT NULL,
            key_id BLOB NOT NULL,             -- 31 bytes, packed label
            value BLOB NOT NULL,              -- 124 bytes, chunked and zero-padded
            label TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Delegation grants; consumed is 0 or 1 and only ever goes 0 -> 1
        CREATE TABLE grants (
            grant_key BLOB PRIMARY KEY,
            consumed INTEGER NOT NULL DEFAULT 0,
            issued_at INTEGER NOT NULL,
            consumed_at INTEGER
        );

        CREATE INDEX idx_credentials_owner_key ON credentials(owner, key_id, position);
        "#,
    )?;

    Ok(())
}

/// Migration v3: spent transaction keys.
fn apply_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per committed certified transaction; rows are never deleted
        CREATE TABLE transactions (
            transaction_key BLOB PRIMARY KEY,
            committed_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
