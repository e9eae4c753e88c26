//! The instances registry and the lazy ghost reconciler.
//!
//! Every successful write path refreshes a class-level sorted set of
//! identifier → last-write time. The registry is a hint: its cardinality may
//! exceed the true live count (ghosts left by out-of-band deletions such as
//! TTL expiry) or miss live objects written by paths that bypass it
//! (orphans). Authoritative existence is always the backing hash.
//!
//! Ghosts are never swept proactively. When a load discovers one, the
//! reconciler prunes the registry entry and every declared structure still
//! referencing the identifier, then the load reports "not found" as a normal
//! result.

use tracing::debug;

use lattice_schema::{keys, RelationKind, Schema, TrackingScope};
use lattice_store::{KvStore, StoreError};
use lattice_types::WriteStamp;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Insert or refresh the registry entry at the given write stamp.
pub(crate) fn touch(
    store: &dyn KvStore,
    class: &str,
    identifier: &str,
    now: WriteStamp,
) -> EngineResult<bool> {
    Ok(store.sorted_add(&keys::instances_key(class), identifier, now.as_score())?)
}

/// Remove the registry entry. Removing an absent identifier is a no-op.
pub(crate) fn unregister(store: &dyn KvStore, class: &str, identifier: &str) -> EngineResult<bool> {
    Ok(store.sorted_remove(&keys::instances_key(class), identifier)?)
}

/// Fast registration hint. Not authoritative.
pub(crate) fn registered(store: &dyn KvStore, class: &str, identifier: &str) -> EngineResult<bool> {
    Ok(store
        .sorted_score(&keys::instances_key(class), identifier)?
        .is_some())
}

/// Remove a member from a collection whose kind is only known at runtime
/// (reverse-registry entries may point at sets or sorted sets).
pub(crate) fn remove_member(
    store: &dyn KvStore,
    key: &str,
    member: &str,
) -> EngineResult<bool> {
    match store.set_remove(key, member) {
        Ok(changed) => Ok(changed),
        Err(StoreError::WrongKind { .. }) => Ok(store.sorted_remove(key, member)?),
        Err(err) => Err(err.into()),
    }
}

/// Prune every stale reference to an identifier whose backing hash is gone.
///
/// Returns the keys that actually held a stale entry. Parent-scoped
/// structures are reached through the reverse registry; multi-index buckets
/// through a bounded scan.
pub(crate) fn reconcile_ghost(
    store: &dyn KvStore,
    schema: &Schema,
    config: &EngineConfig,
    class: &str,
    identifier: &str,
) -> EngineResult<Vec<String>> {
    let mut pruned: Vec<String> = Vec::new();

    let instances_key = keys::instances_key(class);
    if store.sorted_remove(&instances_key, identifier)? {
        pruned.push(instances_key);
    }

    for relationship in schema.relationships_for(class)? {
        let name = relationship.name.as_str();
        match &relationship.kind {
            RelationKind::Tracking { scope, .. } => match scope {
                TrackingScope::Global | TrackingScope::Class => {
                    let key = keys::tracking_key(class, name, scope, None)
                        .expect("non-parent scope needs no owner");
                    if store.sorted_remove(&key, identifier)? {
                        pruned.push(key);
                    }
                }
                // Parent-scoped entries are reverse-registered and handled
                // below.
                TrackingScope::Parent { .. } => {}
            },
            RelationKind::UniqueIndex { scope, .. } => {
                let key = keys::index_key(class, name, *scope);
                let entries = store.hash_get_all(&key)?;
                let mut any = false;
                for (field, mapped) in entries {
                    if mapped == identifier && store.hash_delete(&key, &field)? {
                        any = true;
                    }
                }
                if any {
                    pruned.push(key);
                }
            }
            RelationKind::MultiIndex { scope, .. } => {
                let pattern = keys::multi_index_pattern(class, name, *scope);
                for bucket in store.scan_keys(&pattern, config.reconcile_scan_limit)? {
                    if store.set_remove(&bucket, identifier)? {
                        pruned.push(bucket);
                    }
                }
            }
            // Reverse-registered; handled below.
            RelationKind::Membership { .. } => {}
        }
    }

    let memberships_key = keys::memberships_key(class, identifier);
    for key in store.set_members(&memberships_key)? {
        if remove_member(store, &key, identifier)? {
            pruned.push(key);
        }
    }
    if store.delete(&memberships_key)? {
        pruned.push(memberships_key);
    }

    debug!(
        class,
        identifier,
        pruned = pruned.len(),
        "reconciled ghost entry"
    );
    Ok(pruned)
}
