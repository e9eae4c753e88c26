use thiserror::Error;

/// Errors produced by identifier validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentError {
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },
}
