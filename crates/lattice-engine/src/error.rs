use lattice_schema::SchemaError;
use lattice_store::StoreError;
use lattice_types::IdentError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// "Not found" is never here: [`Engine::load`](crate::Engine::load) returns
/// `Ok(None)` for a miss.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or malformed identifier; checked before any store command.
    #[error("identifier error: {0}")]
    Ident(#[from] IdentError),

    /// Schema lookup or configuration failure.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Backing-store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// `Engine::from_installed` was called before `schema::install`.
    #[error("no schema installed for this process")]
    SchemaNotInstalled,

    /// A unique index already maps this value to a different identifier.
    #[error(
        "unique index {index:?} on class {class:?} already maps {value:?} to \
         {existing:?} (attempted {incoming:?})"
    )]
    UniqueIndexConflict {
        class: String,
        index: String,
        value: String,
        existing: String,
        incoming: String,
    },

    /// Counter threshold or amount was not a positive integer.
    #[error("invalid counter arguments: threshold {threshold}, amount {amount}")]
    InvalidCounterArgs { threshold: i64, amount: i64 },
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
