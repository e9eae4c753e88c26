//! The frozen schema: every class descriptor, cross-validated.
//!
//! [`SchemaBuilder::build`] is the freeze point. After it succeeds the
//! schema is immutable and safe for unsynchronized concurrent reads from any
//! thread; engines share it via `Arc`. A process that wants one ambient
//! schema installs it once through [`install`]; a second install is a
//! configuration error, not a replacement.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::class::ClassDescriptor;
use crate::decl::{RelationKind, Relationship, TrackingScope};
use crate::error::SchemaError;

static INSTALLED: OnceLock<Arc<Schema>> = OnceLock::new();

/// The immutable registry of class descriptors.
#[derive(Clone, Debug)]
pub struct Schema {
    classes: HashMap<String, ClassDescriptor>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            classes: Vec::new(),
        }
    }

    /// The descriptor for a class, or a configuration error.
    pub fn descriptor(&self, class: &str) -> Result<&ClassDescriptor, SchemaError> {
        self.classes
            .get(class)
            .ok_or_else(|| SchemaError::UnknownClass {
                class: class.to_string(),
            })
    }

    /// The descriptor for a class, if registered.
    pub fn get(&self, class: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    /// All registered descriptors, in arbitrary order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    /// The class and its ancestors, child first.
    pub fn ancestor_chain(&self, class: &str) -> Result<Vec<&ClassDescriptor>, SchemaError> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(name) = current {
            let descriptor = self.descriptor(name)?;
            chain.push(descriptor);
            current = descriptor.parent();
        }
        Ok(chain)
    }

    /// Every relationship active for a class: its own declarations plus its
    /// ancestors', child first. A child declaration with the same name as an
    /// ancestor's shadows it.
    pub fn relationships_for(&self, class: &str) -> Result<Vec<&Relationship>, SchemaError> {
        let mut seen = HashSet::new();
        let mut active = Vec::new();
        for descriptor in self.ancestor_chain(class)? {
            for relationship in descriptor.relationships() {
                if seen.insert(relationship.name.as_str()) {
                    active.push(relationship);
                }
            }
        }
        Ok(active)
    }
}

/// Builder for a [`Schema`]; collects descriptors, then freezes.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    classes: Vec<ClassDescriptor>,
}

impl SchemaBuilder {
    /// Register a class descriptor.
    pub fn class(mut self, descriptor: ClassDescriptor) -> Self {
        self.classes.push(descriptor);
        self
    }

    /// Cross-validate and freeze the schema.
    ///
    /// Fails on duplicate classes, parents that are not registered,
    /// inheritance cycles, and owner classes (in membership or
    /// parent-scoped tracking declarations) that are not registered.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut classes: HashMap<String, ClassDescriptor> = HashMap::new();
        for descriptor in self.classes {
            let name = descriptor.class().to_string();
            if classes.insert(name.clone(), descriptor).is_some() {
                return Err(SchemaError::DuplicateClass { class: name });
            }
        }

        for descriptor in classes.values() {
            // Parent must exist and the chain must terminate.
            let mut visited = HashSet::new();
            visited.insert(descriptor.class());
            let mut current = descriptor.parent();
            while let Some(parent) = current {
                let parent_descriptor =
                    classes
                        .get(parent)
                        .ok_or_else(|| SchemaError::UnknownParent {
                            class: descriptor.class().to_string(),
                            parent: parent.to_string(),
                        })?;
                if !visited.insert(parent) {
                    return Err(SchemaError::InheritanceCycle {
                        class: descriptor.class().to_string(),
                    });
                }
                current = parent_descriptor.parent();
            }

            // Owner classes must be registered.
            for relationship in descriptor.relationships() {
                let owner = match &relationship.kind {
                    RelationKind::Membership { owner_class, .. } => Some(owner_class),
                    RelationKind::Tracking {
                        scope: TrackingScope::Parent { owner_class, .. },
                        ..
                    } => Some(owner_class),
                    _ => None,
                };
                if let Some(owner) = owner {
                    if !classes.contains_key(owner) {
                        return Err(SchemaError::UnknownOwner {
                            class: descriptor.class().to_string(),
                            relation: relationship.name.clone(),
                            owner: owner.clone(),
                        });
                    }
                }
            }
        }

        Ok(Schema { classes })
    }
}

/// Install a schema as the process-wide ambient schema, once.
///
/// Returns the shared handle on success. A second call is a configuration
/// error -- the installed schema is write-once and read-only thereafter.
pub fn install(schema: Schema) -> Result<Arc<Schema>, SchemaError> {
    let shared = Arc::new(schema);
    INSTALLED
        .set(Arc::clone(&shared))
        .map_err(|_| SchemaError::AlreadyInstalled)?;
    Ok(shared)
}

/// The process-wide schema, if one has been installed.
pub fn installed() -> Option<Arc<Schema>> {
    INSTALLED.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{IndexScope, ScoreSource};

    fn customer() -> ClassDescriptor {
        ClassDescriptor::builder("customer")
            .identifier_field("custid")
            .relationship(Relationship::tracking(
                "created",
                TrackingScope::Class,
                ScoreSource::field("created_at"),
            ))
            .relationship(Relationship::unique_index("by-email", "email", IndexScope::Class))
            .build()
            .unwrap()
    }

    #[test]
    fn build_and_lookup() {
        let schema = Schema::builder().class(customer()).build().unwrap();
        assert!(schema.get("customer").is_some());
        assert!(schema.get("domain").is_none());
        assert_eq!(
            schema.descriptor("domain").unwrap_err(),
            SchemaError::UnknownClass {
                class: "domain".into()
            }
        );
    }

    #[test]
    fn duplicate_class_rejected() {
        let err = Schema::builder()
            .class(customer())
            .class(customer())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateClass {
                class: "customer".into()
            }
        );
    }

    #[test]
    fn unknown_parent_rejected() {
        let child = ClassDescriptor::builder("vip_customer")
            .parent("customer")
            .build()
            .unwrap();
        let err = Schema::builder().class(child).build().unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownParent {
                class: "vip_customer".into(),
                parent: "customer".into()
            }
        );
    }

    #[test]
    fn inheritance_cycle_rejected() {
        let a = ClassDescriptor::builder("a").parent("b").build().unwrap();
        let b = ClassDescriptor::builder("b").parent("a").build().unwrap();
        let err = Schema::builder().class(a).class(b).build().unwrap_err();
        assert!(matches!(err, SchemaError::InheritanceCycle { .. }));
    }

    #[test]
    fn unknown_owner_rejected() {
        let domain = ClassDescriptor::builder("domain")
            .relationship(Relationship::membership("domains", "customer", "custid"))
            .build()
            .unwrap();
        let err = Schema::builder().class(domain).build().unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownOwner {
                class: "domain".into(),
                relation: "domains".into(),
                owner: "customer".into()
            }
        );
    }

    #[test]
    fn ancestor_chain_is_child_first() {
        let base = ClassDescriptor::builder("record")
            .relationship(Relationship::tracking(
                "touched",
                TrackingScope::Class,
                ScoreSource::field("updated_at"),
            ))
            .build()
            .unwrap();
        let child = ClassDescriptor::builder("customer")
            .parent("record")
            .build()
            .unwrap();
        let schema = Schema::builder().class(base).class(child).build().unwrap();

        let chain = schema.ancestor_chain("customer").unwrap();
        let names: Vec<&str> = chain.iter().map(|d| d.class()).collect();
        assert_eq!(names, vec!["customer", "record"]);
    }

    #[test]
    fn relationships_are_inherited_via_chain_traversal() {
        let base = ClassDescriptor::builder("record")
            .relationship(Relationship::tracking(
                "touched",
                TrackingScope::Class,
                ScoreSource::field("updated_at"),
            ))
            .build()
            .unwrap();
        let child = ClassDescriptor::builder("customer")
            .parent("record")
            .relationship(Relationship::unique_index("by-email", "email", IndexScope::Class))
            .build()
            .unwrap();
        let schema = Schema::builder().class(base).class(child).build().unwrap();

        let active = schema.relationships_for("customer").unwrap();
        let names: Vec<&str> = active.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["by-email", "touched"]);

        // The base class sees only its own declaration.
        let base_active = schema.relationships_for("record").unwrap();
        assert_eq!(base_active.len(), 1);
    }

    #[test]
    fn child_declaration_shadows_ancestor() {
        let base = ClassDescriptor::builder("record")
            .relationship(Relationship::tracking(
                "created",
                TrackingScope::Class,
                ScoreSource::constant(1.0),
            ))
            .build()
            .unwrap();
        let child = ClassDescriptor::builder("customer")
            .parent("record")
            .relationship(Relationship::tracking(
                "created",
                TrackingScope::Global,
                ScoreSource::constant(2.0),
            ))
            .build()
            .unwrap();
        let schema = Schema::builder().class(base).class(child).build().unwrap();

        let active = schema.relationships_for("customer").unwrap();
        assert_eq!(active.len(), 1);
        match &active[0].kind {
            RelationKind::Tracking { scope, .. } => assert_eq!(scope, &TrackingScope::Global),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn install_is_write_once() {
        // The process-wide cell is shared across tests; this is the only
        // test that touches it.
        let first = install(Schema::builder().class(customer()).build().unwrap());
        match first {
            Ok(shared) => {
                assert!(shared.get("customer").is_some());
                assert!(installed().is_some());
            }
            Err(SchemaError::AlreadyInstalled) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
        let second = install(Schema::builder().build().unwrap());
        assert_eq!(second.unwrap_err(), SchemaError::AlreadyInstalled);
    }
}
