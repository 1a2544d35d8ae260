//! Consume-once registries.
//!
//! Claims and delegation grants share one state machine: a key is absent,
//! issued, or consumed. Consumed is terminal. Nothing here ever moves a key
//! back out of `Consumed`, and nothing removes keys.
//!
//! ```text
//!   (absent) --issue--> Issued --consume--> Consumed
//!      \                                       ^
//!       `---------------claim-----------------'
//! ```
//!
//! [`MemoryStore`](crate::MemoryStore) holds these directly under its write
//! lock; [`SqliteStore`](crate::SqliteStore) expresses the same transitions as
//! `INSERT OR IGNORE` and a compare-and-swap `UPDATE`.

use std::collections::HashMap;
use std::hash::Hash;

/// State of a registered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    Issued,
    Consumed,
}

/// Result of issuing a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// The key was absent and is now issued.
    Issued,
    /// The key was already issued and unused. Nothing changed.
    AlreadyIssued,
    /// The key was already consumed. It stays consumed.
    AlreadyConsumed,
}

/// Result of consuming a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This call performed the transition to `Consumed`.
    Consumed,
    /// An earlier call already consumed the key.
    AlreadyConsumed,
    /// The key was never issued.
    NotIssued,
}

impl ConsumeOutcome {
    /// True only for the single call that won the key.
    pub fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// In-memory consume-once registry.
#[derive(Debug, Clone)]
pub struct ConsumptionRegistry<K> {
    slots: HashMap<K, SlotState>,
}

impl<K: Eq + Hash> ConsumptionRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Current state of a key, `None` if never issued or claimed.
    pub fn state(&self, key: &K) -> Option<SlotState> {
        self.slots.get(key).copied()
    }

    /// True if the key has been consumed.
    pub fn is_consumed(&self, key: &K) -> bool {
        self.state(key) == Some(SlotState::Consumed)
    }

    /// Issue a key. Never resets a consumed key.
    pub fn issue(&mut self, key: K) -> IssueOutcome {
        match self.slots.get(&key) {
            Some(SlotState::Issued) => IssueOutcome::AlreadyIssued,
            Some(SlotState::Consumed) => IssueOutcome::AlreadyConsumed,
            None => {
                self.slots.insert(key, SlotState::Issued);
                IssueOutcome::Issued
            }
        }
    }

    /// Consume an issued key.
    pub fn consume(&mut self, key: &K) -> ConsumeOutcome {
        let Some(slot) = self.slots.get_mut(key) else {
            return ConsumeOutcome::NotIssued;
        };
        match *slot {
            SlotState::Issued => {
                *slot = SlotState::Consumed;
                ConsumeOutcome::Consumed
            }
            SlotState::Consumed => ConsumeOutcome::AlreadyConsumed,
        }
    }

    /// Consume a key whether or not it was issued first.
    ///
    /// Used for claims, which come into existence already consumed.
    pub fn claim(&mut self, key: K) -> ConsumeOutcome {
        match self.slots.insert(key, SlotState::Consumed) {
            Some(SlotState::Consumed) => ConsumeOutcome::AlreadyConsumed,
            Some(SlotState::Issued) | None => ConsumeOutcome::Consumed,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K: Eq + Hash> Default for ConsumptionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
