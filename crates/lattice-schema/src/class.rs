//! Per-class descriptors and their builder.
//!
//! A [`ClassDescriptor`] is created once at schema-definition time and
//! shared by every instance of the class. It is immutable after
//! [`ClassBuilder::build`]; per-class validation happens there, cross-class
//! validation (unknown parents and owners, cycles) when the whole schema is
//! frozen.

use std::collections::HashSet;

use crate::decl::{RelationKind, Relationship, TrackingScope};
use crate::error::SchemaError;
use crate::names::{validate_class_name, validate_field_name, validate_relation_name};

/// Static, per-class configuration: identifier field plus the declared
/// relationships, with optional single inheritance by parent class name.
#[derive(Clone, Debug)]
pub struct ClassDescriptor {
    class: String,
    identifier_field: String,
    parent: Option<String>,
    relationships: Vec<Relationship>,
}

impl ClassDescriptor {
    /// Start building a descriptor for the named class.
    pub fn builder(class: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            class: class.into(),
            identifier_field: "id".into(),
            parent: None,
            relationships: Vec::new(),
        }
    }

    /// The class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The field holding the object's identifier.
    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    /// The parent class, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The relationships declared directly on this class (not inherited).
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// A directly declared relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.name == name)
    }
}

/// Builder for a [`ClassDescriptor`].
#[derive(Debug)]
pub struct ClassBuilder {
    class: String,
    identifier_field: String,
    parent: Option<String>,
    relationships: Vec<Relationship>,
}

impl ClassBuilder {
    /// Name the field holding the object's identifier (default `"id"`).
    pub fn identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    /// Inherit declarations from a parent class.
    pub fn parent(mut self, class: impl Into<String>) -> Self {
        self.parent = Some(class.into());
        self
    }

    /// Declare a relationship.
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// Fails on invalid or reserved names, duplicate relationship names
    /// within the class, and malformed declarations. These are
    /// configuration errors: fatal, never silently ignored.
    pub fn build(self) -> Result<ClassDescriptor, SchemaError> {
        validate_class_name(&self.class)?;
        validate_field_name(&self.identifier_field)?;
        if let Some(parent) = &self.parent {
            validate_class_name(parent)?;
        }

        let mut seen = HashSet::new();
        for rel in &self.relationships {
            validate_relation_name(&rel.name)?;
            if !seen.insert(rel.name.as_str()) {
                return Err(SchemaError::DuplicateRelationship {
                    class: self.class.clone(),
                    name: rel.name.clone(),
                });
            }
            match &rel.kind {
                RelationKind::Tracking { scope, .. } => {
                    if let TrackingScope::Parent {
                        owner_class,
                        owner_field,
                    } = scope
                    {
                        validate_class_name(owner_class)?;
                        validate_field_name(owner_field)?;
                    }
                }
                RelationKind::UniqueIndex { field, .. }
                | RelationKind::MultiIndex { field, .. } => {
                    validate_field_name(field)?;
                }
                RelationKind::Membership {
                    owner_class,
                    owner_field,
                } => {
                    validate_class_name(owner_class)?;
                    validate_field_name(owner_field)?;
                }
            }
        }

        Ok(ClassDescriptor {
            class: self.class,
            identifier_field: self.identifier_field,
            parent: self.parent,
            relationships: self.relationships,
        })
    }
}
