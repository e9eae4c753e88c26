//! The atomic propagator: save-time mutation planning.
//!
//! A save computes every (key, member, score/value) mutation implied by the
//! class's active declarations and applies them as idempotent commands in
//! one batch. Unique-index slots are the exception: they are claimed first,
//! per key, through the store's atomic set-if-absent primitive, because a
//! claim can fail and the failure must surface as a validation error before
//! the batch lands.
//!
//! A failed score source or a missing owner/index field never aborts
//! unrelated relationships -- it is recorded per relationship in the
//! [`SaveOutcome`] and the save continues.

use serde::{Deserialize, Serialize};

use lattice_schema::{keys, FieldMap, RelationKind, Schema, TrackingScope};
use lattice_store::KvCommand;
use lattice_types::WriteStamp;

use crate::error::EngineResult;

/// One relationship that could not be propagated during a save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFailure {
    /// The declaration's name.
    pub relation: String,
    /// Why propagation was skipped.
    pub reason: String,
}

/// The result of a successful save.
///
/// `failures` lists relationships whose propagation was skipped; the object
/// hash, registry touch, and every other relationship were still applied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub class: String,
    pub identifier: String,
    /// Every key the save wrote, in application order, deduplicated.
    pub keys_touched: Vec<String>,
    /// Per-relationship propagation failures.
    pub failures: Vec<RelationshipFailure>,
}

/// A unique-index slot to claim before the idempotent batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UniqueClaim {
    pub relation: String,
    pub key: String,
    /// The indexed field value (the hash field inside the index key).
    pub value: String,
}

/// The full mutation plan for one save.
#[derive(Debug, Default)]
pub(crate) struct SavePlan {
    pub unique_claims: Vec<UniqueClaim>,
    pub commands: Vec<KvCommand>,
    pub failures: Vec<RelationshipFailure>,
}

impl SavePlan {
    /// Every key the plan writes, in application order, deduplicated.
    pub fn keys_touched(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for claim in &self.unique_claims {
            if !keys.iter().any(|k| k == &claim.key) {
                keys.push(claim.key.clone());
            }
        }
        for command in &self.commands {
            let key = command.key();
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }
}

fn failure(relation: &str, reason: impl Into<String>) -> RelationshipFailure {
    RelationshipFailure {
        relation: relation.to_string(),
        reason: reason.into(),
    }
}

/// Compute the mutation plan for saving one object.
///
/// The identifier is assumed validated by the caller. Planning is pure: no
/// store access happens here.
pub(crate) fn plan_save(
    schema: &Schema,
    class: &str,
    identifier: &str,
    fields: &FieldMap,
    now: WriteStamp,
) -> EngineResult<SavePlan> {
    let descriptor = schema.descriptor(class)?;
    let relationships = schema.relationships_for(class)?;

    let mut plan = SavePlan::default();

    // The authoritative object hash, with the identifier field filled in if
    // the caller left it out.
    let mut hash_fields: Vec<(String, String)> = fields
        .iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    if !fields.contains_key(descriptor.identifier_field()) {
        hash_fields.push((
            descriptor.identifier_field().to_string(),
            identifier.to_string(),
        ));
    }
    plan.commands.push(KvCommand::HashSet {
        key: keys::object_key(class, identifier),
        fields: hash_fields,
    });

    // Every successful write path refreshes the instances registry.
    plan.commands.push(KvCommand::SortedAdd {
        key: keys::instances_key(class),
        member: identifier.to_string(),
        score: now.as_score(),
    });

    for relationship in relationships {
        let name = relationship.name.as_str();
        match &relationship.kind {
            RelationKind::Tracking { scope, score } => {
                let owner_id = match scope {
                    TrackingScope::Parent { owner_field, .. } => {
                        match fields.get(owner_field) {
                            Some(owner_id) => Some(owner_id.as_str()),
                            None => {
                                plan.failures.push(failure(
                                    name,
                                    format!("owner field {owner_field:?} is missing"),
                                ));
                                continue;
                            }
                        }
                    }
                    _ => None,
                };
                let score = match score.resolve(fields) {
                    Ok(score) => score,
                    Err(err) => {
                        plan.failures.push(failure(name, err.to_string()));
                        continue;
                    }
                };
                if !score.is_finite() || score < 0.0 {
                    plan.failures
                        .push(failure(name, format!("resolved to invalid score {score}")));
                    continue;
                }
                // owner_id is present whenever the scope needs one.
                let key = keys::tracking_key(class, name, scope, owner_id)
                    .expect("parent owner resolved above");
                plan.commands.push(KvCommand::SortedAdd {
                    key: key.clone(),
                    member: identifier.to_string(),
                    score,
                });
                if matches!(scope, TrackingScope::Parent { .. }) {
                    // Parent-scoped collections are recorded in the reverse
                    // registry like memberships, so discovery can find them
                    // after the owner field changes.
                    plan.commands.push(KvCommand::SetAdd {
                        key: keys::memberships_key(class, identifier),
                        member: key,
                    });
                }
            }
            RelationKind::UniqueIndex { field, scope } => match fields.get(field) {
                Some(value) => plan.unique_claims.push(UniqueClaim {
                    relation: name.to_string(),
                    key: keys::index_key(class, name, *scope),
                    value: value.clone(),
                }),
                None => {
                    plan.failures
                        .push(failure(name, format!("indexed field {field:?} is missing")));
                }
            },
            RelationKind::MultiIndex { field, scope } => match fields.get(field) {
                Some(value) => plan.commands.push(KvCommand::SetAdd {
                    key: keys::multi_index_bucket(class, name, *scope, value),
                    member: identifier.to_string(),
                }),
                None => {
                    plan.failures
                        .push(failure(name, format!("indexed field {field:?} is missing")));
                }
            },
            RelationKind::Membership {
                owner_class,
                owner_field,
            } => match fields.get(owner_field) {
                Some(owner_id) => {
                    let collection = keys::membership_key(owner_class, owner_id, class, name);
                    plan.commands.push(KvCommand::SetAdd {
                        key: collection.clone(),
                        member: identifier.to_string(),
                    });
                    // Reverse direction: the member records which collection
                    // keys hold it, which is what cascade discovery and the
                    // ghost reconciler walk later.
                    plan.commands.push(KvCommand::SetAdd {
                        key: keys::memberships_key(class, identifier),
                        member: collection,
                    });
                }
                None => {
                    plan.failures.push(failure(
                        name,
                        format!("owner field {owner_field:?} is missing"),
                    ));
                }
            },
        }
    }

    Ok(plan)
}
