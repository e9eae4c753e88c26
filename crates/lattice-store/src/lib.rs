//! Backing-store boundary for Lattice.
//!
//! This crate defines the command vocabulary the relationship engine consumes
//! from a schemaless key-value store: hash field get/set/delete, set add and
//! remove, sorted-set add with score, key existence and deletion, key-pattern
//! scan, and one atomic compare-and-increment primitive.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`MemoryStore`] -- `RwLock`-guarded in-memory store for tests and
//!   embedding
//!
//! # Design Rules
//!
//! 1. Every mutation is idempotent: re-applying the same command converges
//!    to the same state.
//! 2. Each trait method is individually atomic at the single-key level.
//! 3. Batched application ([`KvStore::apply_batch`]) is an optimization;
//!    correctness never depends on multi-key atomicity.
//! 4. A missing key reads as empty (`Ok(None)` / empty map), never an error.
//! 5. Accessing a key with the wrong structure kind is an error, never a
//!    silent overwrite.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod command;
pub mod error;
pub mod memory;
pub mod pattern;
pub mod traits;

pub use command::{KvCommand, KvReply};
pub use error::{StoreError, StoreResult, ValueKind};
pub use memory::MemoryStore;
pub use pattern::key_matches;
pub use traits::KvStore;
