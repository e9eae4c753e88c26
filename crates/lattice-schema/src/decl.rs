//! Relationship declarations.
//!
//! A [`Relationship`] is one rule binding an object's identifier to a
//! derived structure. Declarations carry their scope inside the kind, so an
//! ill-scoped declaration (a parent-scoped index, a class-scoped membership)
//! is unrepresentable; the remaining cross-class checks happen when the
//! schema is frozen.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An object's field values as the engine sees them: field name to
/// already-serialized string value. Scalar encode/decode belongs to an
/// external serializer collaborator; the engine only moves these strings.
pub type FieldMap = BTreeMap<String, String>;

/// A computed score function, evaluated against an object's fields at save
/// time. Returning `None` declines to produce a score; the save records a
/// per-relationship failure and continues.
pub type ComputeScoreFn = Arc<dyn Fn(&FieldMap) -> Option<f64> + Send + Sync>;

/// Where a tracking relationship's score comes from.
#[derive(Clone)]
pub enum ScoreSource {
    /// A field holding a decimal number.
    Field(String),
    /// A fixed score for every member.
    Constant(f64),
    /// A computed rule. The label names the rule in failure reports.
    Computed { label: String, func: ComputeScoreFn },
}

impl ScoreSource {
    /// Score from a numeric field.
    pub fn field(name: impl Into<String>) -> Self {
        ScoreSource::Field(name.into())
    }

    /// A constant score.
    pub fn constant(score: f64) -> Self {
        ScoreSource::Constant(score)
    }

    /// A computed score rule.
    pub fn computed(
        label: impl Into<String>,
        func: impl Fn(&FieldMap) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        ScoreSource::Computed {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// Resolve the score against an object's fields.
    pub fn resolve(&self, fields: &FieldMap) -> Result<f64, ScoreSourceError> {
        match self {
            ScoreSource::Field(name) => {
                let raw = fields
                    .get(name)
                    .ok_or_else(|| ScoreSourceError::MissingField { field: name.clone() })?;
                raw.parse::<f64>()
                    .map_err(|_| ScoreSourceError::Unparseable {
                        field: name.clone(),
                        value: raw.clone(),
                    })
            }
            ScoreSource::Constant(score) => Ok(*score),
            ScoreSource::Computed { label, func } => {
                func(fields).ok_or_else(|| ScoreSourceError::Declined {
                    label: label.clone(),
                })
            }
        }
    }
}

impl fmt::Debug for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreSource::Field(name) => f.debug_tuple("Field").field(name).finish(),
            ScoreSource::Constant(score) => f.debug_tuple("Constant").field(score).finish(),
            ScoreSource::Computed { label, .. } => {
                f.debug_struct("Computed").field("label", label).finish()
            }
        }
    }
}

/// Why a score source failed to resolve.
///
/// These are per-relationship failures: they are reported in the save
/// outcome and never abort unrelated relationships.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoreSourceError {
    #[error("score field {field:?} is missing")]
    MissingField { field: String },

    #[error("score field {field:?} holds non-numeric value {value:?}")]
    Unparseable { field: String, value: String },

    #[error("computed score rule {label:?} declined to produce a score")]
    Declined { label: String },
}

/// Scope of a tracking relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingScope {
    /// One collection shared across all classes.
    Global,
    /// One collection per declaring class.
    Class,
    /// One collection per owner instance; the owner's identifier is read
    /// from `owner_field` on the tracked object.
    Parent {
        owner_class: String,
        owner_field: String,
    },
}

/// Scope of an index relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexScope {
    /// One index shared across all classes.
    Global,
    /// One index per declaring class.
    Class,
}

/// Destroy-time cleanup strategy, declared per relationship.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadePolicy {
    /// Delete this object's entries from the declared structure.
    #[default]
    Remove,
    /// Leave the stale entry; the ghost reconciler prunes it on next access.
    Ignore,
    /// `Remove`, plus best-effort removal from dynamically discovered
    /// related keys (bounded, O(relationships found)).
    Cascade,
}

/// The kind of derived structure a relationship maintains.
#[derive(Clone, Debug)]
pub enum RelationKind {
    /// Presence with a score in a class-, global-, or parent-scoped sorted
    /// collection.
    Tracking {
        scope: TrackingScope,
        score: ScoreSource,
    },
    /// A field-value → identifier mapping; a value maps to at most one
    /// identifier, and claiming an already-mapped value is a conflict.
    UniqueIndex { field: String, scope: IndexScope },
    /// A field-value → identifier-set mapping.
    MultiIndex { field: String, scope: IndexScope },
    /// Bidirectional group membership under an owner instance; the owner's
    /// identifier is read from `owner_field` on the member object.
    Membership {
        owner_class: String,
        owner_field: String,
    },
}

/// One declared relationship: a named rule with a cleanup policy.
#[derive(Clone, Debug)]
pub struct Relationship {
    /// Collection or index name; unique within the declaring class.
    pub name: String,
    /// What the relationship maintains.
    pub kind: RelationKind,
    /// Destroy-time cleanup policy.
    pub cascade: CascadePolicy,
}

impl Relationship {
    /// A tracking declaration.
    pub fn tracking(name: impl Into<String>, scope: TrackingScope, score: ScoreSource) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Tracking { scope, score },
            cascade: CascadePolicy::default(),
        }
    }

    /// A unique-index declaration.
    pub fn unique_index(
        name: impl Into<String>,
        field: impl Into<String>,
        scope: IndexScope,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::UniqueIndex {
                field: field.into(),
                scope,
            },
            cascade: CascadePolicy::default(),
        }
    }

    /// A multi-index declaration.
    pub fn multi_index(
        name: impl Into<String>,
        field: impl Into<String>,
        scope: IndexScope,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::MultiIndex {
                field: field.into(),
                scope,
            },
            cascade: CascadePolicy::default(),
        }
    }

    /// A membership declaration under an owner class.
    pub fn membership(
        name: impl Into<String>,
        owner_class: impl Into<String>,
        owner_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Membership {
                owner_class: owner_class.into(),
                owner_field: owner_field.into(),
            },
            cascade: CascadePolicy::default(),
        }
    }

    /// Override the cascade policy.
    pub fn with_cascade(mut self, policy: CascadePolicy) -> Self {
        self.cascade = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn field_source_resolves_numeric_values() {
        let source = ScoreSource::field("created_at");
        let score = source
            .resolve(&fields(&[("created_at", "1700000000")]))
            .unwrap();
        assert_eq!(score, 1_700_000_000.0);
    }

    #[test]
    fn field_source_missing_field() {
        let source = ScoreSource::field("created_at");
        assert_eq!(
            source.resolve(&fields(&[])).unwrap_err(),
            ScoreSourceError::MissingField {
                field: "created_at".into()
            }
        );
    }

    #[test]
    fn field_source_unparseable_value() {
        let source = ScoreSource::field("created_at");
        let err = source
            .resolve(&fields(&[("created_at", "yesterday")]))
            .unwrap_err();
        assert_eq!(
            err,
            ScoreSourceError::Unparseable {
                field: "created_at".into(),
                value: "yesterday".into()
            }
        );
    }

    #[test]
    fn constant_source_always_resolves() {
        let source = ScoreSource::constant(7.5);
        assert_eq!(source.resolve(&fields(&[])).unwrap(), 7.5);
    }

    #[test]
    fn computed_source_resolves_or_declines() {
        let source = ScoreSource::computed("priority-boost", |f| {
            f.get("priority").and_then(|p| p.parse::<f64>().ok())
        });
        assert_eq!(source.resolve(&fields(&[("priority", "3")])).unwrap(), 3.0);
        assert_eq!(
            source.resolve(&fields(&[])).unwrap_err(),
            ScoreSourceError::Declined {
                label: "priority-boost".into()
            }
        );
    }

    #[test]
    fn cascade_policy_default_is_remove() {
        let rel = Relationship::tracking("created", TrackingScope::Class, ScoreSource::constant(0.0));
        assert_eq!(rel.cascade, CascadePolicy::Remove);
        let rel = rel.with_cascade(CascadePolicy::Ignore);
        assert_eq!(rel.cascade, CascadePolicy::Ignore);
    }

    #[test]
    fn score_source_debug_hides_closure() {
        let source = ScoreSource::computed("rule", |_| None);
        let debug = format!("{source:?}");
        assert!(debug.contains("rule"));
    }

    #[test]
    fn scope_and_policy_serde_roundtrip() {
        let scope = TrackingScope::Parent {
            owner_class: "customer".into(),
            owner_field: "custid".into(),
        };
        let json = serde_json::to_string(&scope).unwrap();
        let parsed: TrackingScope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scope);

        let json = serde_json::to_string(&CascadePolicy::Cascade).unwrap();
        let parsed: CascadePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, CascadePolicy::Cascade);
    }
}
