//! # Attestvault Store
//!
//! Storage abstraction for Attestvault. Provides a trait-based interface for
//! ledger state with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The ledger is storage-agnostic: it holds any [`Store`]. The persistent
//! implementation is [`SqliteStore`], with [`MemoryStore`] for tests and
//! ephemeral ledgers.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//! - [`ConsumptionRegistry`] - The consume-once state machine behind claims and grants
//! - [`CommitResult`], [`RemoveResult`] - Outcomes of attestation writes
//! - [`ReleaseResult`] - Outcome of a delegated or owner read
//!
//! ## Usage
//!
//! ```rust,no_run
//! use attestvault_store::{SqliteStore, Store};
//! use attestvault_core::ArtifactHash;
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let artifact = ArtifactHash::of_artifact(b"skill bytes");
//!     let aggregate = store.aggregate(&artifact).await.unwrap();
//!     assert_eq!(aggregate.count, 0);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic compound writes**: each trait method is one transaction
//! - **Permanent claims**: a consumed claim is never released
//! - **Positional vaults**: rotation replaces a record without moving it
//! - **Single-use grants**: consumption is a compare-and-swap
//! - **Single-commit transactions**: a certified write spends its transaction
//!   key in the same atomic step

pub mod consumption;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use consumption::{ConsumeOutcome, ConsumptionRegistry, IssueOutcome, SlotState};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CommitResult, ReleaseResult, RemoveResult, Store};
