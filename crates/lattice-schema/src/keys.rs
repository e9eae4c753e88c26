//! Deterministic key derivation for the persisted layout.
//!
//! Every declared relationship maps to exactly one key shape. Derived keys
//! incorporate the declaring class, the owner class where one exists, and
//! the collection name -- two relationships with the same collection name but
//! different classes can never share a key. Layout:
//!
//! ```text
//! {class}:{id}:object                          object hash
//! {class}:instances                            instances registry
//! {class}:{id}:memberships                     reverse membership registry
//! global:{name} | {class}:{name}               tracking (global / class)
//! {owner_class}:{owner_id}:{class}:{name}      tracking/membership (parent)
//! global:{name} | {class}:{name}               unique index hash
//! {index key}:{value}                          multi index bucket
//! counter:{name}                               bounded counters
//! ```
//!
//! Name validation guarantees no segment contains the separator, so the
//! derivation is collision-free by construction.

use crate::decl::{IndexScope, TrackingScope};

/// Prefix for globally scoped collections and indexes.
pub const GLOBAL_PREFIX: &str = "global";

/// Prefix for bounded counters.
pub const COUNTER_PREFIX: &str = "counter";

/// The object's backing hash key.
pub fn object_key(class: &str, id: &str) -> String {
    format!("{class}:{id}:object")
}

/// The class's instances registry key.
pub fn instances_key(class: &str) -> String {
    format!("{class}:instances")
}

/// The object's reverse membership registry key.
pub fn memberships_key(class: &str, id: &str) -> String {
    format!("{class}:{id}:memberships")
}

/// A bounded counter's key.
pub fn counter_key(name: &str) -> String {
    format!("{COUNTER_PREFIX}:{name}")
}

/// Scan pattern matching every backing hash of a class.
pub fn object_scan_pattern(class: &str) -> String {
    format!("{class}:*:object")
}

/// Scan pattern matching every key scoped under one object instance.
pub fn owned_keys_pattern(class: &str, id: &str) -> String {
    format!("{class}:{id}:*")
}

/// The sorted-set key for a tracking declaration.
///
/// Parent-scoped tracking needs the owner's identifier; `None` is returned
/// when it is not available (the caller reports this per relationship).
pub fn tracking_key(
    class: &str,
    name: &str,
    scope: &TrackingScope,
    owner_id: Option<&str>,
) -> Option<String> {
    match scope {
        TrackingScope::Global => Some(format!("{GLOBAL_PREFIX}:{name}")),
        TrackingScope::Class => Some(format!("{class}:{name}")),
        TrackingScope::Parent { owner_class, .. } => {
            owner_id.map(|owner_id| format!("{owner_class}:{owner_id}:{class}:{name}"))
        }
    }
}

/// The hash key for a unique index, also the prefix for multi-index buckets.
pub fn index_key(class: &str, name: &str, scope: IndexScope) -> String {
    match scope {
        IndexScope::Global => format!("{GLOBAL_PREFIX}:{name}"),
        IndexScope::Class => format!("{class}:{name}"),
    }
}

/// The set key for one multi-index value bucket.
pub fn multi_index_bucket(class: &str, name: &str, scope: IndexScope, value: &str) -> String {
    format!("{}:{value}", index_key(class, name, scope))
}

/// Scan pattern matching every bucket of a multi index.
pub fn multi_index_pattern(class: &str, name: &str, scope: IndexScope) -> String {
    format!("{}:*", index_key(class, name, scope))
}

/// The set key for a membership collection under one owner instance.
pub fn membership_key(owner_class: &str, owner_id: &str, member_class: &str, name: &str) -> String {
    format!("{owner_class}:{owner_id}:{member_class}:{name}")
}
