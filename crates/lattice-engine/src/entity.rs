//! The object view the engine operates on.
//!
//! The engine never synthesizes per-class accessor methods; everything is
//! data-driven dispatch over [`Entity`] plus the class's declared
//! relationships. Field values cross this boundary as already-serialized
//! strings -- scalar encode/decode belongs to an external serializer.

use lattice_schema::FieldMap;

/// An application record as the engine sees it.
///
/// The identifier must be non-empty before any registry or relationship
/// operation; the engine validates it and fails fast otherwise.
pub trait Entity {
    /// The declaring class name, matching a registered class descriptor.
    fn class(&self) -> &str;

    /// The object's identifier. Immutable once assigned.
    fn identifier(&self) -> &str;

    /// The object's current field values, serialized.
    fn fields(&self) -> FieldMap;
}

/// A plain data carrier implementing [`Entity`].
///
/// Useful on its own and as the bridge for application types that prefer to
/// convert rather than implement the trait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericEntity {
    class: String,
    identifier: String,
    fields: FieldMap,
}

impl GenericEntity {
    /// Create an entity with no fields set.
    pub fn new(class: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            identifier: identifier.into(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set or overwrite a field.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Read a field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl Entity for GenericEntity {
    fn class(&self) -> &str {
        &self.class
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn fields(&self) -> FieldMap {
        self.fields.clone()
    }
}
