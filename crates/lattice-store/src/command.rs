//! The mutation command vocabulary.
//!
//! A save computes its full set of mutations as [`KvCommand`] values and
//! hands them to [`KvStore::apply_batch`](crate::KvStore::apply_batch) in one
//! round trip. Every command is idempotent, so a batch that is partially
//! applied (crash, network failure) converges on retry.

use serde::{Deserialize, Serialize};

/// One idempotent write against the backing store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KvCommand {
    /// Set hash fields (create the hash if missing, overwrite the fields).
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Delete one hash field.
    HashDelete { key: String, field: String },
    /// Add a member to a set.
    SetAdd { key: String, member: String },
    /// Remove a member from a set.
    SetRemove { key: String, member: String },
    /// Add a member to a sorted set with the given score, refreshing the
    /// score if the member is already present.
    SortedAdd {
        key: String,
        member: String,
        score: f64,
    },
    /// Remove a member from a sorted set.
    SortedRemove { key: String, member: String },
    /// Delete a whole key.
    Delete { key: String },
}

impl KvCommand {
    /// The key this command targets.
    pub fn key(&self) -> &str {
        match self {
            KvCommand::HashSet { key, .. }
            | KvCommand::HashDelete { key, .. }
            | KvCommand::SetAdd { key, .. }
            | KvCommand::SetRemove { key, .. }
            | KvCommand::SortedAdd { key, .. }
            | KvCommand::SortedRemove { key, .. }
            | KvCommand::Delete { key } => key,
        }
    }
}

/// Reply to one applied command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvReply {
    /// The command completed; no membership change to report.
    Done,
    /// Whether the command changed membership (added/removed something that
    /// was not already in the target state).
    Changed(bool),
}

impl KvReply {
    /// `true` when the command changed store state.
    pub fn changed(&self) -> bool {
        matches!(self, KvReply::Done | KvReply::Changed(true))
    }
}
