//! The cascade engine: destroy-time cleanup planning and execution.
//!
//! Destroy applies each declaration's cleanup policy -- `Remove` deletes the
//! object's entries from the declared structure, `Ignore` leaves the stale
//! entry for the ghost reconciler, `Cascade` additionally removes the
//! identifier from dynamically discovered keys. Discovery is bounded: the
//! object's reverse-membership registry is exact and O(memberships found),
//! and the scan for collections the object *owns* visits at most
//! `EngineConfig::cascade_scan_limit` keys. Finding nothing is success.
//!
//! [`plan_destroy`] computes the affected key set; `destroy` executes that
//! same plan and `dry_run` returns it unexecuted, so the two report
//! identical key sets by construction.

use serde::{Deserialize, Serialize};

use lattice_schema::{keys, CascadePolicy, FieldMap, RelationKind, Schema, TrackingScope};
use lattice_store::KvStore;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::instances::remove_member;
use crate::propagate::RelationshipFailure;

/// How one affected key gets cleaned up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupAction {
    /// Remove the identifier from a sorted set.
    SortedRemove { member: String },
    /// Remove the identifier from a set.
    SetRemove { member: String },
    /// Delete an index hash field, but only while it still maps to this
    /// identifier -- a successor's claim is never clobbered.
    UnindexField { field: String, member: String },
    /// Delete the whole key.
    DeleteKey,
}

/// Where an affected key came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOrigin {
    /// A statically declared relationship.
    Declared,
    /// Found by cascade's dynamic discovery.
    Discovered,
    /// The object's own bookkeeping: backing hash, registry entry, reverse
    /// membership registry. Always cleaned, regardless of declarations.
    Base,
}

/// One key the destroy will touch (or, in a dry run, would touch).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedKey {
    pub key: String,
    pub action: CleanupAction,
    /// The declaration responsible, for `Declared` entries.
    pub relation: Option<String>,
    pub origin: KeyOrigin,
}

/// The affected-keys report shared by `destroy` and `dry_run`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CascadeReport {
    pub class: String,
    pub identifier: String,
    /// Every key the destroy touches, in application order.
    pub affected: Vec<AffectedKey>,
    /// Declared relationships that could not be planned (missing owner or
    /// index fields). Reported, never raised.
    pub skipped: Vec<RelationshipFailure>,
    /// `false` for a dry run.
    pub executed: bool,
    /// Entries actually removed; zero for a dry run.
    pub removed: usize,
}

impl CascadeReport {
    /// The affected keys, deduplicated, in application order.
    pub fn affected_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for entry in &self.affected {
            if !keys.contains(&entry.key.as_str()) {
                keys.push(&entry.key);
            }
        }
        keys
    }
}

fn already_planned(affected: &[AffectedKey], key: &str) -> bool {
    affected.iter().any(|entry| entry.key == key)
}

/// Compute the exact key set a destroy would touch.
///
/// Reads the store (reverse registry, owned-key scan) but never mutates.
pub(crate) fn plan_destroy(
    schema: &Schema,
    config: &EngineConfig,
    store: &dyn KvStore,
    class: &str,
    identifier: &str,
    fields: &FieldMap,
    policy_override: Option<CascadePolicy>,
) -> EngineResult<CascadeReport> {
    let relationships = schema.relationships_for(class)?;

    let mut affected: Vec<AffectedKey> = Vec::new();
    let mut skipped: Vec<RelationshipFailure> = Vec::new();
    let mut discover = false;

    for relationship in relationships {
        let name = relationship.name.as_str();
        let policy = policy_override.unwrap_or(relationship.cascade);
        match policy {
            CascadePolicy::Ignore => continue,
            CascadePolicy::Remove => {}
            CascadePolicy::Cascade => discover = true,
        }

        match &relationship.kind {
            RelationKind::Tracking { scope, .. } => {
                let owner_id = match scope {
                    TrackingScope::Parent { owner_field, .. } => match fields.get(owner_field) {
                        Some(owner_id) => Some(owner_id.as_str()),
                        None => {
                            skipped.push(RelationshipFailure {
                                relation: name.to_string(),
                                reason: format!("owner field {owner_field:?} is missing"),
                            });
                            continue;
                        }
                    },
                    _ => None,
                };
                let key = keys::tracking_key(class, name, scope, owner_id)
                    .expect("parent owner resolved above");
                affected.push(AffectedKey {
                    key,
                    action: CleanupAction::SortedRemove {
                        member: identifier.to_string(),
                    },
                    relation: Some(name.to_string()),
                    origin: KeyOrigin::Declared,
                });
            }
            RelationKind::UniqueIndex { field, scope } => match fields.get(field) {
                Some(value) => affected.push(AffectedKey {
                    key: keys::index_key(class, name, *scope),
                    action: CleanupAction::UnindexField {
                        field: value.clone(),
                        member: identifier.to_string(),
                    },
                    relation: Some(name.to_string()),
                    origin: KeyOrigin::Declared,
                }),
                None => skipped.push(RelationshipFailure {
                    relation: name.to_string(),
                    reason: format!("indexed field {field:?} is missing"),
                }),
            },
            RelationKind::MultiIndex { field, scope } => match fields.get(field) {
                Some(value) => affected.push(AffectedKey {
                    key: keys::multi_index_bucket(class, name, *scope, value),
                    action: CleanupAction::SetRemove {
                        member: identifier.to_string(),
                    },
                    relation: Some(name.to_string()),
                    origin: KeyOrigin::Declared,
                }),
                None => skipped.push(RelationshipFailure {
                    relation: name.to_string(),
                    reason: format!("indexed field {field:?} is missing"),
                }),
            },
            RelationKind::Membership {
                owner_class,
                owner_field,
            } => match fields.get(owner_field) {
                Some(owner_id) => affected.push(AffectedKey {
                    key: keys::membership_key(owner_class, owner_id, class, name),
                    action: CleanupAction::SetRemove {
                        member: identifier.to_string(),
                    },
                    relation: Some(name.to_string()),
                    origin: KeyOrigin::Declared,
                }),
                None => skipped.push(RelationshipFailure {
                    relation: name.to_string(),
                    reason: format!("owner field {owner_field:?} is missing"),
                }),
            },
        }
    }

    let memberships_key = keys::memberships_key(class, identifier);
    let object_key = keys::object_key(class, identifier);

    if discover {
        // Collections that hold this object as a member, beyond what the
        // current field values derive (e.g. the owner field changed since an
        // earlier save).
        for key in store.set_members(&memberships_key)? {
            if !already_planned(&affected, &key) {
                affected.push(AffectedKey {
                    key,
                    action: CleanupAction::SetRemove {
                        member: identifier.to_string(),
                    },
                    relation: None,
                    origin: KeyOrigin::Discovered,
                });
            }
        }

        // Collections this object owns (other classes' parent-scoped keys
        // live under its prefix). Bounded by configuration.
        let pattern = keys::owned_keys_pattern(class, identifier);
        for key in store.scan_keys(&pattern, config.cascade_scan_limit)? {
            if key == object_key || key == memberships_key {
                continue;
            }
            if !already_planned(&affected, &key) {
                affected.push(AffectedKey {
                    key,
                    action: CleanupAction::DeleteKey,
                    relation: None,
                    origin: KeyOrigin::Discovered,
                });
            }
        }
    }

    // Bookkeeping is always cleaned, regardless of declared relationships.
    affected.push(AffectedKey {
        key: keys::instances_key(class),
        action: CleanupAction::SortedRemove {
            member: identifier.to_string(),
        },
        relation: None,
        origin: KeyOrigin::Base,
    });
    affected.push(AffectedKey {
        key: memberships_key,
        action: CleanupAction::DeleteKey,
        relation: None,
        origin: KeyOrigin::Base,
    });
    affected.push(AffectedKey {
        key: object_key,
        action: CleanupAction::DeleteKey,
        relation: None,
        origin: KeyOrigin::Base,
    });

    Ok(CascadeReport {
        class: class.to_string(),
        identifier: identifier.to_string(),
        affected,
        skipped,
        executed: false,
        removed: 0,
    })
}

/// Execute a destroy plan, returning how many entries were actually removed.
///
/// Every action is idempotent; executing a plan twice removes nothing the
/// second time.
pub(crate) fn execute(store: &dyn KvStore, report: &mut CascadeReport) -> EngineResult<()> {
    let mut removed = 0;
    for entry in &report.affected {
        let changed = match &entry.action {
            CleanupAction::SortedRemove { member } => store.sorted_remove(&entry.key, member)?,
            CleanupAction::SetRemove { member } => remove_member(store, &entry.key, member)?,
            CleanupAction::UnindexField { field, member } => {
                // Only unmap while the slot still points at this object; a
                // successor's claim stays.
                if store.hash_get(&entry.key, field)?.as_deref() == Some(member.as_str()) {
                    store.hash_delete(&entry.key, field)?
                } else {
                    false
                }
            }
            CleanupAction::DeleteKey => store.delete(&entry.key)?,
        };
        if changed {
            removed += 1;
        }
    }
    report.executed = true;
    report.removed = removed;
    Ok(())
}
