//! # Attestvault Testkit
//!
//! Testing utilities for Attestvault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known inputs with expected outputs for the codec,
//!   content hashing, key derivation and trust classification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up ledgers and parties, in memory
//!   or on disk
//!
//! ## Golden Vectors
//!
//! ```rust
//! use attestvault_testkit::vectors::verify_all_vectors;
//!
//! for result in verify_all_vectors() {
//!     assert!(result.matches, "{}: {}", result.name, result.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use attestvault_testkit::generators::{transaction_from_params, AttestParams};
//!
//! proptest! {
//!     #[test]
//!     fn certified_attest_verifies(params: AttestParams) {
//!         prop_assert!(transaction_from_params(&params).verify_signature().is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use attestvault_testkit::fixtures::{multi_party_fixtures, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let artifact = TestFixture::artifact("my-skill");
//! let parties = multi_party_fixtures(3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, sqlite_ledger, TestFixture};
pub use generators::{transaction_from_params, AttestParams};
pub use vectors::{report_json, verify_all_vectors, VectorResult};
