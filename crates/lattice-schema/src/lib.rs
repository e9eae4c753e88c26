//! Relationship registry for Lattice.
//!
//! Relationships bind an object's identifier to derived structures in the
//! backing store: scored tracking collections, unique and multi-value field
//! indexes, and bidirectional group membership. Declarations are registered
//! per class through [`ClassBuilder`], frozen into an immutable [`Schema`]
//! by [`SchemaBuilder::build`], and shared by every instance -- nothing is
//! declared per object, and nothing can be mutated after the build.
//!
//! # Key Types
//!
//! - [`Relationship`] / [`RelationKind`] -- one declared rule
//! - [`ScoreSource`] -- where a tracking score comes from (field, constant,
//!   or computed function)
//! - [`ClassDescriptor`] / [`ClassBuilder`] -- per-class declarations with
//!   single inheritance by parent name
//! - [`Schema`] / [`SchemaBuilder`] -- the frozen registry, with ancestor
//!   chain traversal and optional process-wide installation
//! - [`keys`] -- deterministic, collision-free key derivation for every
//!   declared structure
//!
//! Configuration errors (bad names, duplicates, unknown classes, cycles) are
//! fatal at build time, never silently ignored.

pub mod class;
pub mod decl;
pub mod error;
pub mod keys;
pub mod names;
pub mod schema;

pub use class::{ClassBuilder, ClassDescriptor};
pub use decl::{
    CascadePolicy, FieldMap, IndexScope, RelationKind, Relationship, ScoreSource,
    ScoreSourceError, TrackingScope,
};
pub use error::SchemaError;
pub use schema::{install, installed, Schema, SchemaBuilder};
