use thiserror::Error;

/// Configuration errors raised while declaring or freezing a schema.
///
/// All of these are fatal at schema-definition time; a schema that builds
/// successfully is internally consistent and immutable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid {what} name {name:?}: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: String,
    },

    #[error("relationship name {name:?} is reserved")]
    ReservedName { name: String },

    #[error("class {class:?} is declared more than once")]
    DuplicateClass { class: String },

    #[error("class {class:?} declares relationship {name:?} more than once")]
    DuplicateRelationship { class: String, name: String },

    #[error("unknown class {class:?}")]
    UnknownClass { class: String },

    #[error("class {class:?} names unknown parent {parent:?}")]
    UnknownParent { class: String, parent: String },

    #[error("class {class:?} relationship {relation:?} names unknown owner class {owner:?}")]
    UnknownOwner {
        class: String,
        relation: String,
        owner: String,
    },

    #[error("inheritance cycle through class {class:?}")]
    InheritanceCycle { class: String },

    #[error("a schema is already installed for this process")]
    AlreadyInstalled,
}
