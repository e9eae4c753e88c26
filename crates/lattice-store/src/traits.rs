//! The [`KvStore`] trait defining the backing-store interface.
//!
//! Any backend (in-memory, Redis-style server, embedded database) implements
//! this trait to back the relationship engine. The engine composes these
//! commands; it never issues a check-then-act existence test.

use std::collections::BTreeMap;

use crate::command::{KvCommand, KvReply};
use crate::error::StoreResult;

/// Backing store for object hashes, sets, sorted sets, and counters.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make each
/// method individually atomic at the single-key level. Multi-key atomicity
/// in [`Self::apply_batch`] is an optimization backends may provide; the
/// engine's correctness never depends on it.
pub trait KvStore: Send + Sync {
    // ---- hashes ----

    /// Set hash fields, creating the hash if the key is missing.
    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()>;

    /// Set a hash field only if it is currently absent.
    ///
    /// Returns `Ok(true)` if the field was written, `Ok(false)` if the field
    /// already existed (its value is left untouched). This is the atomic
    /// claim primitive behind unique indexes.
    fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;

    /// Read one hash field. `Ok(None)` when the key or field is missing.
    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Read all fields of a hash. An empty map when the key is missing.
    fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    /// Delete one hash field. `Ok(true)` if the field existed.
    fn hash_delete(&self, key: &str, field: &str) -> StoreResult<bool>;

    // ---- sets ----

    /// Add a member to a set. `Ok(true)` if it was not already present.
    fn set_add(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Remove a member from a set. `Ok(true)` if it was present.
    fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Whether the set contains the member.
    fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// All members of a set, sorted. Empty when the key is missing.
    fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    // ---- sorted sets ----

    /// Add a member with a score, refreshing the score if already present.
    ///
    /// Returns `Ok(true)` if the member was newly added, `Ok(false)` if only
    /// its score was refreshed.
    fn sorted_add(&self, key: &str, member: &str, score: f64) -> StoreResult<bool>;

    /// Remove a member from a sorted set. `Ok(true)` if it was present.
    fn sorted_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// The member's score, or `Ok(None)` when absent.
    fn sorted_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// Cardinality of a sorted set. Zero when the key is missing.
    fn sorted_len(&self, key: &str) -> StoreResult<u64>;

    /// All (member, score) entries ordered by score, then member.
    fn sorted_entries(&self, key: &str) -> StoreResult<Vec<(String, f64)>>;

    // ---- keys ----

    /// Whether the key exists (any kind).
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Delete a key of any kind. `Ok(true)` if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Keys matching a glob pattern (`*` and `?`), at most `limit` of them.
    ///
    /// The scan is bounded by construction: callers pass the cap, backends
    /// never walk more of the keyspace than they must to fill it.
    fn scan_keys(&self, pattern: &str, limit: usize) -> StoreResult<Vec<String>>;

    // ---- counters ----

    /// Atomically: if the counter's current value is below `threshold`,
    /// add `amount` and return `Some(new_value)`; otherwise return `None`
    /// and leave the value unchanged.
    ///
    /// This must be one atomic operation at the store (a server-side script
    /// on a networked backend), never a read-then-write pair: under
    /// concurrent callers a non-atomic implementation allows the counter to
    /// exceed the threshold. `threshold` and `amount` must be positive.
    fn increment_if_below(
        &self,
        key: &str,
        threshold: i64,
        amount: i64,
    ) -> StoreResult<Option<i64>>;

    /// The counter's current value. Zero when the key is missing.
    fn counter_value(&self, key: &str) -> StoreResult<i64>;

    // ---- batching ----

    /// Apply a batch of mutation commands.
    ///
    /// Default implementation applies each command in submission order.
    /// Backends with a pipeline/transaction primitive may override to issue
    /// the whole batch in one round trip; each command remains individually
    /// idempotent either way, so partial application converges on retry.
    fn apply_batch(&self, commands: &[KvCommand]) -> StoreResult<Vec<KvReply>> {
        commands.iter().map(|cmd| self.apply_one(cmd)).collect()
    }

    /// Apply one mutation command.
    fn apply_one(&self, command: &KvCommand) -> StoreResult<KvReply> {
        match command {
            KvCommand::HashSet { key, fields } => {
                self.hash_set(key, fields)?;
                Ok(KvReply::Done)
            }
            KvCommand::HashDelete { key, field } => {
                Ok(KvReply::Changed(self.hash_delete(key, field)?))
            }
            KvCommand::SetAdd { key, member } => Ok(KvReply::Changed(self.set_add(key, member)?)),
            KvCommand::SetRemove { key, member } => {
                Ok(KvReply::Changed(self.set_remove(key, member)?))
            }
            KvCommand::SortedAdd { key, member, score } => {
                Ok(KvReply::Changed(self.sorted_add(key, member, *score)?))
            }
            KvCommand::SortedRemove { key, member } => {
                Ok(KvReply::Changed(self.sorted_remove(key, member)?))
            }
            KvCommand::Delete { key } => Ok(KvReply::Changed(self.delete(key)?)),
        }
    }
}
