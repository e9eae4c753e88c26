//! Foundation types for Lattice.
//!
//! This crate provides the two primitives every other Lattice crate builds
//! on: validated object identifiers and wall-clock write stamps. Every other
//! Lattice crate depends on `lattice-types`.
//!
//! # Key Types
//!
//! - [`validate_identifier`] -- guard applied before any registry or
//!   relationship operation touches the store
//! - [`WriteStamp`] -- unix-seconds wall-clock stamp used as the instances
//!   registry score and as the integer component of encoded scores

pub mod error;
pub mod ident;
pub mod stamp;

pub use error::IdentError;
pub use ident::{validate_identifier, KEY_SEPARATOR};
pub use stamp::WriteStamp;
