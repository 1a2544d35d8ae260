//! SQLite implementation of the Store trait.
//!
//! The persistent storage backend. Uses rusqlite with bundled SQLite, wrapped
//! in async via `tokio::task::spawn_blocking`. Every compound operation runs
//! inside one SQLite transaction; dropping the transaction without commit
//! rolls it back.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;

use attestvault_core::{
    Aggregate, ArtifactHash, AttestationRecord, ClaimKey, CredentialRecord, Ed25519PublicKey,
    GrantKey, KeyId, Methodology, Principal, Quality, RecordId, TransactionKey, VaultValue,
};

use crate::consumption::{ConsumeOutcome, IssueOutcome, SlotState};
use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{CommitResult, ReleaseResult, RemoveResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and its parent directory) and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        debug!(path = %path.display(), "opened sqlite store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    /// Run `f` inside one SQLite transaction and commit whatever it returns.
    ///
    /// An error from `f` rolls everything back.
    async fn in_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn blob<const N: usize>(row: &Row<'_>, column: &str) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(column)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, column.into(), Type::Blob))
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(err))
}

/// Scores are u64 in the API and i64 in SQLite.
fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn from_sql_int(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn row_to_attestation(row: &Row<'_>) -> rusqlite::Result<AttestationRecord> {
    let quality: i64 = row.get("quality")?;
    let methodology: i64 = row.get("methodology")?;

    Ok(AttestationRecord {
        id: RecordId::from_bytes(blob(row, "record_id")?),
        owner: Ed25519PublicKey::from_bytes(blob(row, "owner")?),
        artifact: ArtifactHash::from_bytes(blob(row, "artifact")?),
        quality: Quality::new(from_sql_int(quality)).map_err(|e| conversion_error(3, e))?,
        methodology: u8::try_from(methodology)
            .map_err(|e| conversion_error(4, e))
            .and_then(|code| Methodology::from_code(code).map_err(|e| conversion_error(4, e)))?,
    })
}

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    let value: Vec<u8> = row.get("value")?;

    Ok(CredentialRecord {
        id: RecordId::from_bytes(blob(row, "record_id")?),
        owner: Ed25519PublicKey::from_bytes(blob(row, "owner")?),
        key_id: KeyId::from_bytes(blob(row, "key_id")?),
        value: VaultValue::from_flat(&value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Blob, Box::new(e))
        })?,
        label: row.get("label")?,
    })
}

fn read_aggregate(conn: &Connection, artifact: &ArtifactHash) -> Result<Aggregate> {
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT score, count FROM aggregates WHERE artifact = ?1",
            params![artifact.0.as_slice()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(row
        .map(|(score, count)| Aggregate {
            score: from_sql_int(score),
            count: from_sql_int(count),
        })
        .unwrap_or_default())
}

fn first_credential_in(
    tx: &Transaction<'_>,
    owner: &Principal,
    key_id: &KeyId,
) -> Result<Option<(i64, CredentialRecord)>> {
    tx.query_row(
        "SELECT position, record_id, owner, key_id, value, label FROM credentials
         WHERE owner = ?1 AND key_id = ?2 ORDER BY position LIMIT 1",
        params![owner.0.as_slice(), key_id.0.as_slice()],
        |row| Ok((row.get("position")?, row_to_credential(row)?)),
    )
    .optional()
    .map_err(StoreError::from)
}

/// Spend a transaction key. Fails if it was spent before.
fn spend_in(tx: &Transaction<'_>, transaction: Option<&TransactionKey>) -> Result<()> {
    let Some(key) = transaction else {
        return Ok(());
    };
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO transactions (transaction_key, committed_at) VALUES (?1, ?2)",
        params![key.0.as_slice(), now_millis()],
    )?;
    if inserted == 0 {
        return Err(StoreError::TransactionReplayed);
    }
    Ok(())
}

fn consume_grant_in(tx: &Transaction<'_>, key: &GrantKey) -> Result<ConsumeOutcome> {
    // Compare-and-swap: only the caller that flips 0 -> 1 wins.
    let updated = tx.execute(
        "UPDATE grants SET consumed = 1, consumed_at = ?2
         WHERE grant_key = ?1 AND consumed = 0",
        params![key.0.as_slice(), now_millis()],
    )?;
    if updated == 1 {
        return Ok(ConsumeOutcome::Consumed);
    }

    let exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM grants WHERE grant_key = ?1",
            params![key.0.as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(if exists.is_some() {
        ConsumeOutcome::AlreadyConsumed
    } else {
        ConsumeOutcome::NotIssued
    })
}

const ATTESTATION_COLUMNS: &str = "record_id, owner, artifact, quality, methodology";

#[async_trait]
impl Store for SqliteStore {
    async fn commit_attestation(
        &self,
        record: &AttestationRecord,
        claim: &ClaimKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<CommitResult> {
        let record = record.clone();
        let claim = *claim;
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;
            let now = now_millis();

            let claimed = tx.execute(
                "INSERT OR IGNORE INTO claims (claim_key, consumed_at) VALUES (?1, ?2)",
                params![claim.0.as_slice(), now],
            )?;
            if claimed == 0 {
                return Ok(CommitResult::ClaimConsumed);
            }

            tx.execute(
                "INSERT INTO attestations (record_id, owner, artifact, quality, methodology, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.0.as_slice(),
                    record.owner.0.as_slice(),
                    record.artifact.0.as_slice(),
                    to_sql_int(record.quality.value()),
                    i64::from(record.methodology.to_code()),
                    now,
                ],
            )?;

            tx.execute(
                "INSERT INTO aggregates (artifact, score, count) VALUES (?1, ?2, 1)
                 ON CONFLICT(artifact) DO UPDATE SET
                    score = score + excluded.score,
                    count = count + 1",
                params![record.artifact.0.as_slice(), to_sql_int(record.quality.value())],
            )?;

            let aggregate = read_aggregate(tx, &record.artifact)?;
            Ok(CommitResult::Committed { aggregate })
        })
        .await
    }

    async fn remove_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        expected_quality: Option<Quality>,
        transaction: Option<&TransactionKey>,
    ) -> Result<RemoveResult> {
        let owner = *owner;
        let artifact = *artifact;
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;

            let found = tx
                .query_row(
                    &format!(
                        "SELECT position, {} FROM attestations
                         WHERE owner = ?1 AND artifact = ?2 ORDER BY position LIMIT 1",
                        ATTESTATION_COLUMNS
                    ),
                    params![owner.0.as_slice(), artifact.0.as_slice()],
                    |row| Ok((row.get::<_, i64>("position")?, row_to_attestation(row)?)),
                )
                .optional()?;

            let Some((position, record)) = found else {
                return Ok(RemoveResult::NotFound);
            };

            if let Some(expected) = expected_quality {
                if expected != record.quality {
                    return Ok(RemoveResult::QualityMismatch {
                        live: record.quality,
                    });
                }
            }

            tx.execute(
                "DELETE FROM attestations WHERE position = ?1",
                params![position],
            )?;
            tx.execute(
                "UPDATE aggregates SET
                    score = MAX(score - ?2, 0),
                    count = MAX(count - 1, 0)
                 WHERE artifact = ?1",
                params![artifact.0.as_slice(), to_sql_int(record.quality.value())],
            )?;

            let aggregate = read_aggregate(tx, &artifact)?;
            Ok(RemoveResult::Removed { record, aggregate })
        })
        .await
    }

    async fn find_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
    ) -> Result<Option<AttestationRecord>> {
        let owner = *owner;
        let artifact = *artifact;

        self.blocking(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM attestations
                     WHERE owner = ?1 AND artifact = ?2 ORDER BY position LIMIT 1",
                    ATTESTATION_COLUMNS
                ),
                params![owner.0.as_slice(), artifact.0.as_slice()],
                row_to_attestation,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn attestations_for(&self, owner: &Principal) -> Result<Vec<AttestationRecord>> {
        let owner = *owner;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM attestations WHERE owner = ?1 ORDER BY position",
                ATTESTATION_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![owner.0.as_slice()], row_to_attestation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn aggregate(&self, artifact: &ArtifactHash) -> Result<Aggregate> {
        let artifact = *artifact;
        self.blocking(move |conn| read_aggregate(conn, &artifact)).await
    }

    async fn is_claimed(&self, claim: &ClaimKey) -> Result<bool> {
        let claim = *claim;

        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM claims WHERE claim_key = ?1",
                    params![claim.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn append_credential(
        &self,
        record: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<()> {
        let record = record.clone();
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;
            tx.execute(
                "INSERT INTO credentials (record_id, owner, key_id, value, label, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.0.as_slice(),
                    record.owner.0.as_slice(),
                    record.key_id.0.as_slice(),
                    record.value.to_flat(),
                    record.label,
                    now_millis(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
    ) -> Result<Option<CredentialRecord>> {
        let owner = *owner;
        let key_id = *key_id;

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT record_id, owner, key_id, value, label FROM credentials
                 WHERE owner = ?1 AND key_id = ?2 ORDER BY position LIMIT 1",
                params![owner.0.as_slice(), key_id.0.as_slice()],
                row_to_credential,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn credentials_for(&self, owner: &Principal) -> Result<Vec<CredentialRecord>> {
        let owner = *owner;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record_id, owner, key_id, value, label FROM credentials
                 WHERE owner = ?1 ORDER BY position",
            )?;
            let records = stmt
                .query_map(params![owner.0.as_slice()], row_to_credential)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn remove_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>> {
        let owner = *owner;
        let key_id = *key_id;
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;
            let Some((position, record)) = first_credential_in(tx, &owner, &key_id)? else {
                return Ok(None);
            };

            tx.execute(
                "DELETE FROM credentials WHERE position = ?1",
                params![position],
            )?;
            Ok(Some(record))
        })
        .await
    }

    async fn replace_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        replacement: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>> {
        let owner = *owner;
        let key_id = *key_id;
        let replacement = replacement.clone();
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;
            let Some((position, previous)) = first_credential_in(tx, &owner, &key_id)? else {
                return Ok(None);
            };

            // Update in place so the row keeps its position.
            tx.execute(
                "UPDATE credentials SET record_id = ?2, value = ?3, label = ?4, updated_at = ?5
                 WHERE position = ?1",
                params![
                    position,
                    replacement.id.0.as_slice(),
                    replacement.value.to_flat(),
                    replacement.label,
                    now_millis(),
                ],
            )?;
            Ok(Some(previous))
        })
        .await
    }

    async fn register_grant(
        &self,
        key: &GrantKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<IssueOutcome> {
        let key = *key;
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO grants (grant_key, consumed, issued_at) VALUES (?1, 0, ?2)",
                params![key.0.as_slice(), now_millis()],
            )?;
            if inserted == 1 {
                return Ok(IssueOutcome::Issued);
            }

            let consumed: i64 = tx.query_row(
                "SELECT consumed FROM grants WHERE grant_key = ?1",
                params![key.0.as_slice()],
                |row| row.get(0),
            )?;
            Ok(if consumed == 0 {
                IssueOutcome::AlreadyIssued
            } else {
                IssueOutcome::AlreadyConsumed
            })
        })
        .await
    }

    async fn consume_grant(&self, key: &GrantKey) -> Result<ConsumeOutcome> {
        let key = *key;
        self.in_transaction(move |tx| consume_grant_in(tx, &key)).await
    }

    async fn release_credential(
        &self,
        grant: Option<&GrantKey>,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<ReleaseResult> {
        let grant = grant.copied();
        let owner = *owner;
        let key_id = *key_id;
        let transaction = transaction.copied();

        self.in_transaction(move |tx| {
            spend_in(tx, transaction.as_ref())?;

            if let Some(grant) = grant {
                match consume_grant_in(tx, &grant)? {
                    ConsumeOutcome::Consumed => {}
                    ConsumeOutcome::AlreadyConsumed => return Ok(ReleaseResult::GrantConsumed),
                    ConsumeOutcome::NotIssued => return Ok(ReleaseResult::GrantNotIssued),
                }
            }

            Ok(match first_credential_in(tx, &owner, &key_id)? {
                Some((_, record)) => ReleaseResult::Released(record),
                None => ReleaseResult::NoEntry,
            })
        })
        .await
    }

    async fn grant_state(&self, key: &GrantKey) -> Result<Option<SlotState>> {
        let key = *key;

        self.blocking(move |conn| {
            let consumed: Option<i64> = conn
                .query_row(
                    "SELECT consumed FROM grants WHERE grant_key = ?1",
                    params![key.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(consumed.map(|c| {
                if c == 0 {
                    SlotState::Issued
                } else {
                    SlotState::Consumed
                }
            }))
        })
        .await
    }

    async fn spend_transaction(&self, transaction: &TransactionKey) -> Result<()> {
        let transaction = *transaction;
        self.in_transaction(move |tx| spend_in(tx, Some(&transaction)))
            .await
    }

    async fn is_transaction_spent(&self, transaction: &TransactionKey) -> Result<bool> {
        let transaction = *transaction;

        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM transactions WHERE transaction_key = ?1",
                    params![transaction.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}
