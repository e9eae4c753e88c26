//! The Lattice consistency engine.
//!
//! Lattice augments a schemaless key-value store with application-level
//! relationships: scored tracking collections, field indexes, and
//! bidirectional group membership. This crate keeps those derived structures
//! consistent with the authoritative per-object hashes -- under concurrent
//! writers, partial failures, and out-of-band deletions -- without any
//! background reconciliation process.
//!
//! # Control Flow
//!
//! Construct an object, assign fields, then:
//!
//! - [`Engine::save`] -- the atomic propagator. Claims unique-index slots,
//!   then applies every mutation the declarations imply (object hash,
//!   instances registry, collections, indexes) as one batch of idempotent
//!   commands.
//! - [`Engine::load`] -- reads the backing hash. A miss is a normal
//!   `Ok(None)`, and triggers opportunistic ghost cleanup of stale registry
//!   and index entries as a side effect.
//! - [`Engine::destroy`] -- the cascade engine. Applies each relationship's
//!   cleanup policy (remove / ignore / cascade), with a dry-run variant that
//!   reports the identical key set without mutating.
//!
//! # Design Rules
//!
//! 1. Mutations are idempotent commands, never check-then-act; re-running a
//!    save converges to the same state.
//! 2. The instances registry is a hint. Authoritative existence is always
//!    the backing hash; authoritative counts scan actual keys.
//! 3. Ghost entries are pruned only when access discovers them; orphans are
//!    reported, never silently repaired.
//! 4. Validation failures surface synchronously; already-applied idempotent
//!    mutations are left in place, safe to retry in full.

pub mod cascade;
pub mod config;
pub mod counter;
pub mod engine;
pub mod entity;
pub mod error;
pub mod instances;
pub mod propagate;

pub use cascade::{AffectedKey, CascadeReport, CleanupAction, KeyOrigin};
pub use config::EngineConfig;
pub use counter::BoundedCounter;
pub use engine::Engine;
pub use entity::{Entity, GenericEntity};
pub use error::{EngineError, EngineResult};
pub use propagate::{RelationshipFailure, SaveOutcome};

// The stack callers compose with the engine, re-exported for ergonomic
// imports.
pub use lattice_schema::{
    CascadePolicy, ClassDescriptor, FieldMap, IndexScope, Relationship, Schema, SchemaBuilder,
    ScoreSource, TrackingScope,
};
pub use lattice_score::{decode, encode, has_category, permission_tier, PermissionTier};
pub use lattice_store::{KvStore, MemoryStore};
pub use lattice_types::WriteStamp;
