//! Error types for schema resolution and mapping generation

use thiserror::Error;

/// Result type for mapping generation
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors raised while loading schemas or building the type model.
///
/// Every variant is fatal to the current resolution pass.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("broken reference: \"{reference}\" not found at \"{path}\"")]
    BrokenReference { path: String, reference: String },

    #[error("empty reference at \"{path}\"")]
    EmptyReference { path: String },

    #[error("reference cycle through \"{path}\" never reaches a type")]
    ReferenceCycle { path: String },

    #[error("can't create an array of an empty subtype (array \"{name}\")")]
    DegenerateArray { name: String },

    #[error("can't create an object of an empty subtype")]
    DegenerateObject,

    #[error("failed to get a primitive type for schema type \"{tag}\" and subtype \"{sub_type}\"")]
    UnknownType { tag: String, sub_type: String },

    #[error("name \"{name}\" is registered both as a record and as an alias")]
    NameCollision { name: String },

    #[error("reference resolver used before init()")]
    ResolverNotInitialized,

    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl MappingError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.into(),
            message: message.into(),
        }
    }
}
