use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use tracing::debug;

use crate::command::{KvCommand, KvReply};
use crate::error::{StoreError, StoreResult, ValueKind};
use crate::pattern::key_matches;
use crate::traits::KvStore;

/// One stored value. Each key holds exactly one structure kind; accessing a
/// key with the wrong kind is an error, never a silent overwrite.
#[derive(Clone, Debug)]
enum Value {
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    Sorted(BTreeMap<String, f64>),
    Counter(i64),
}

impl Value {
    fn kind(&self) -> ValueKind {
        match self {
            Value::Hash(_) => ValueKind::Hash,
            Value::Set(_) => ValueKind::Set,
            Value::Sorted(_) => ValueKind::SortedSet,
            Value::Counter(_) => ValueKind::Counter,
        }
    }
}

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. All entries are held behind one
/// `RwLock`; every trait method takes the lock once, which makes it atomic.
/// [`MemoryStore::apply_batch`] and
/// [`MemoryStore::increment_if_below`] hold the write lock across the whole
/// operation, standing in for a networked backend's pipeline and server-side
/// script.
///
/// Collections are created implicitly on first write and are kept when they
/// become empty; only an explicit [`KvStore::delete`] removes the key.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Remove all keys.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// A sorted list of all keys, for diagnostics and tests.
    pub fn all_keys(&self) -> Vec<String> {
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("key_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Locked helpers
// ---------------------------------------------------------------------------
//
// Each mutation is written against `&mut HashMap` so `apply_batch` can apply
// a whole batch under one write lock.

fn wrong_kind(key: &str, expected: ValueKind, found: ValueKind) -> StoreError {
    StoreError::WrongKind {
        key: key.to_string(),
        expected,
        found,
    }
}

fn hash_mut<'a>(
    entries: &'a mut HashMap<String, Value>,
    key: &str,
) -> StoreResult<&'a mut BTreeMap<String, String>> {
    let value = entries
        .entry(key.to_string())
        .or_insert_with(|| Value::Hash(BTreeMap::new()));
    match value {
        Value::Hash(map) => Ok(map),
        other => Err(wrong_kind(key, ValueKind::Hash, other.kind())),
    }
}

fn set_mut<'a>(
    entries: &'a mut HashMap<String, Value>,
    key: &str,
) -> StoreResult<&'a mut BTreeSet<String>> {
    let value = entries
        .entry(key.to_string())
        .or_insert_with(|| Value::Set(BTreeSet::new()));
    match value {
        Value::Set(set) => Ok(set),
        other => Err(wrong_kind(key, ValueKind::Set, other.kind())),
    }
}

fn sorted_mut<'a>(
    entries: &'a mut HashMap<String, Value>,
    key: &str,
) -> StoreResult<&'a mut BTreeMap<String, f64>> {
    let value = entries
        .entry(key.to_string())
        .or_insert_with(|| Value::Sorted(BTreeMap::new()));
    match value {
        Value::Sorted(map) => Ok(map),
        other => Err(wrong_kind(key, ValueKind::SortedSet, other.kind())),
    }
}

fn read_kind<'a>(
    entries: &'a HashMap<String, Value>,
    key: &str,
    expected: ValueKind,
) -> StoreResult<Option<&'a Value>> {
    match entries.get(key) {
        None => Ok(None),
        Some(value) if value.kind() == expected => Ok(Some(value)),
        Some(value) => Err(wrong_kind(key, expected, value.kind())),
    }
}

fn apply_locked(
    entries: &mut HashMap<String, Value>,
    command: &KvCommand,
) -> StoreResult<KvReply> {
    match command {
        KvCommand::HashSet { key, fields } => {
            let map = hash_mut(entries, key)?;
            for (field, value) in fields {
                map.insert(field.clone(), value.clone());
            }
            Ok(KvReply::Done)
        }
        KvCommand::HashDelete { key, field } => match read_kind(entries, key, ValueKind::Hash)? {
            None => Ok(KvReply::Changed(false)),
            Some(_) => {
                let map = hash_mut(entries, key)?;
                Ok(KvReply::Changed(map.remove(field).is_some()))
            }
        },
        KvCommand::SetAdd { key, member } => {
            let set = set_mut(entries, key)?;
            Ok(KvReply::Changed(set.insert(member.clone())))
        }
        KvCommand::SetRemove { key, member } => match read_kind(entries, key, ValueKind::Set)? {
            None => Ok(KvReply::Changed(false)),
            Some(_) => {
                let set = set_mut(entries, key)?;
                Ok(KvReply::Changed(set.remove(member)))
            }
        },
        KvCommand::SortedAdd { key, member, score } => {
            if !score.is_finite() || *score < 0.0 {
                return Err(StoreError::InvalidScore {
                    key: key.clone(),
                    score: *score,
                });
            }
            let map = sorted_mut(entries, key)?;
            Ok(KvReply::Changed(
                map.insert(member.clone(), *score).is_none(),
            ))
        }
        KvCommand::SortedRemove { key, member } => {
            match read_kind(entries, key, ValueKind::SortedSet)? {
                None => Ok(KvReply::Changed(false)),
                Some(_) => {
                    let map = sorted_mut(entries, key)?;
                    Ok(KvReply::Changed(map.remove(member).is_some()))
                }
            }
        }
        KvCommand::Delete { key } => Ok(KvReply::Changed(entries.remove(key).is_some())),
    }
}

// ---------------------------------------------------------------------------
// KvStore implementation
// ---------------------------------------------------------------------------

impl KvStore for MemoryStore {
    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let map = hash_mut(&mut entries, key)?;
        for (field, value) in fields {
            map.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let map = hash_mut(&mut entries, key)?;
        if map.contains_key(field) {
            return Ok(false);
        }
        map.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::Hash)? {
            Some(Value::Hash(map)) => Ok(map.get(field).cloned()),
            _ => Ok(None),
        }
    }

    fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::Hash)? {
            Some(Value::Hash(map)) => Ok(map.clone()),
            _ => Ok(BTreeMap::new()),
        }
    }

    fn hash_delete(&self, key: &str, field: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        match apply_locked(
            &mut entries,
            &KvCommand::HashDelete {
                key: key.to_string(),
                field: field.to_string(),
            },
        )? {
            KvReply::Changed(changed) => Ok(changed),
            KvReply::Done => Ok(false),
        }
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let set = set_mut(&mut entries, key)?;
        Ok(set.insert(member.to_string()))
    }

    fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::Set)? {
            None => Ok(false),
            Some(_) => {
                let set = set_mut(&mut entries, key)?;
                Ok(set.remove(member))
            }
        }
    }

    fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::Set)? {
            Some(Value::Set(set)) => Ok(set.contains(member)),
            _ => Ok(false),
        }
    }

    fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::Set)? {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn sorted_add(&self, key: &str, member: &str, score: f64) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        match apply_locked(
            &mut entries,
            &KvCommand::SortedAdd {
                key: key.to_string(),
                member: member.to_string(),
                score,
            },
        )? {
            KvReply::Changed(changed) => Ok(changed),
            KvReply::Done => Ok(false),
        }
    }

    fn sorted_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::SortedSet)? {
            None => Ok(false),
            Some(_) => {
                let map = sorted_mut(&mut entries, key)?;
                Ok(map.remove(member).is_some())
            }
        }
    }

    fn sorted_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::SortedSet)? {
            Some(Value::Sorted(map)) => Ok(map.get(member).copied()),
            _ => Ok(None),
        }
    }

    fn sorted_len(&self, key: &str) -> StoreResult<u64> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::SortedSet)? {
            Some(Value::Sorted(map)) => Ok(map.len() as u64),
            _ => Ok(0),
        }
    }

    fn sorted_entries(&self, key: &str) -> StoreResult<Vec<(String, f64)>> {
        let entries = self.entries.read().expect("lock poisoned");
        match read_kind(&entries, key, ValueKind::SortedSet)? {
            Some(Value::Sorted(map)) => {
                let mut pairs: Vec<(String, f64)> =
                    map.iter().map(|(m, s)| (m.clone(), *s)).collect();
                // Scores are validated finite on insert, so total_cmp agrees
                // with numeric order here.
                pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(pairs)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.contains_key(key))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(entries.remove(key).is_some())
    }

    fn scan_keys(&self, pattern: &str, limit: usize) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key_matches(pattern, key))
            .cloned()
            .collect();
        // Sorted for deterministic results; a networked backend returns
        // arbitrary scan order and callers must not rely on this.
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }

    fn increment_if_below(
        &self,
        key: &str,
        threshold: i64,
        amount: i64,
    ) -> StoreResult<Option<i64>> {
        if threshold <= 0 || amount <= 0 {
            return Err(StoreError::InvalidCounterArgs { threshold, amount });
        }
        // The write lock is held across the read-check-increment, making the
        // whole operation atomic -- the server-side-script equivalent.
        let mut entries = self.entries.write().expect("lock poisoned");
        let current = match entries.get(key) {
            None => 0,
            Some(Value::Counter(n)) => *n,
            Some(other) => return Err(wrong_kind(key, ValueKind::Counter, other.kind())),
        };
        if current >= threshold {
            return Ok(None);
        }
        let next = current + amount;
        entries.insert(key.to_string(), Value::Counter(next));
        Ok(Some(next))
    }

    fn counter_value(&self, key: &str) -> StoreResult<i64> {
        let entries = self.entries.read().expect("lock poisoned");
        match entries.get(key) {
            None => Ok(0),
            Some(Value::Counter(n)) => Ok(*n),
            Some(other) => Err(wrong_kind(key, ValueKind::Counter, other.kind())),
        }
    }

    fn apply_batch(&self, commands: &[KvCommand]) -> StoreResult<Vec<KvReply>> {
        // One write lock for the whole batch: the in-memory stand-in for a
        // pipeline/transaction round trip.
        let mut entries = self.entries.write().expect("lock poisoned");
        let replies = commands
            .iter()
            .map(|cmd| apply_locked(&mut entries, cmd))
            .collect::<StoreResult<Vec<KvReply>>>()?;
        debug!(commands = commands.len(), "applied mutation batch");
        Ok(replies)
    }
}
