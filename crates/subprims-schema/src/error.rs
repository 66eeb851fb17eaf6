use crate::validator::ValidationFailure;

/// Errors that can occur while building or querying a schema catalog.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// A schema could not be compiled.
    #[error("failed to compile {target} schema for `{type_name}`: {message}")]
    CompileFailed {
        type_name: String,
        target: crate::validator::ValidationTarget,
        message: String,
    },

    /// Schema text is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The message type name is not usable as a catalog key.
    #[error("invalid message type name `{name}`: {reason}")]
    InvalidTypeName { name: String, reason: &'static str },

    /// No schema registered for the given message type.
    #[error("no schema registered for message type `{0}`")]
    UnknownType(String),

    /// A value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
