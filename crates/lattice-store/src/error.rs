use std::fmt;

use serde::{Deserialize, Serialize};

/// The structure kinds a key may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Hash,
    Set,
    SortedSet,
    Counter,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Hash => "hash",
            ValueKind::Set => "set",
            ValueKind::SortedSet => "sorted set",
            ValueKind::Counter => "counter",
        };
        f.write_str(name)
    }
}

/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key exists but holds a different structure kind.
    #[error("wrong kind for key {key:?}: expected {expected}, found {found}")]
    WrongKind {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// A sorted-set score was negative or non-finite.
    #[error("invalid score {score} for key {key:?}")]
    InvalidScore { key: String, score: f64 },

    /// Counter threshold or amount was not a positive integer.
    #[error("invalid counter arguments: threshold {threshold}, amount {amount}")]
    InvalidCounterArgs { threshold: i64, amount: i64 },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
