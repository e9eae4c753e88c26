//! Class and relationship name validation.
//!
//! Names become key segments in the persisted layout, so the rules mirror
//! identifier validation, plus layout-specific reservations:
//!
//! - Must be non-empty
//! - Must not contain `:`, whitespace, control characters, or the pattern
//!   metacharacters `*`, `?`, `[`, `\`
//! - Relationship names must not shadow the fixed layout segments
//!   `object`, `instances`, `memberships`
//! - Class names must not shadow the fixed scope prefixes `global`, `counter`

use lattice_types::{validate_identifier, IdentError};

use crate::error::SchemaError;

/// Relationship names that collide with fixed key-layout segments.
pub const RESERVED_RELATION_NAMES: &[&str] = &["object", "instances", "memberships"];

/// Class names that collide with fixed key prefixes.
pub const RESERVED_CLASS_NAMES: &[&str] = &["global", "counter"];

fn validate_segment(what: &'static str, name: &str) -> Result<(), SchemaError> {
    // Names obey the same segment rules as identifiers.
    validate_identifier(name).map_err(|err| {
        let IdentError::InvalidIdentifier { value, reason } = err;
        SchemaError::InvalidName {
            what,
            name: value,
            reason,
        }
    })
}

/// Validate a class name.
pub fn validate_class_name(name: &str) -> Result<(), SchemaError> {
    validate_segment("class", name)?;
    if RESERVED_CLASS_NAMES.contains(&name) {
        return Err(SchemaError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Validate a relationship (collection/index) name.
pub fn validate_relation_name(name: &str) -> Result<(), SchemaError> {
    validate_segment("relationship", name)?;
    if RESERVED_RELATION_NAMES.contains(&name) {
        return Err(SchemaError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Validate a field name (identifier field, indexed field, owner field).
pub fn validate_field_name(name: &str) -> Result<(), SchemaError> {
    validate_segment("field", name)
}
