//! Ledger configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
///
/// Missing fields in JSON fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Reject vault values longer than the entry capacity instead of
    /// silently truncating them.
    pub reject_oversized_values: bool,
}

impl LedgerConfig {
    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Builder-style toggle for oversized value rejection.
    pub fn reject_oversized_values(mut self, reject: bool) -> Self {
        self.reject_oversized_values = reject;
        self
    }
}
