//! Error types for playbook loading and conversion.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised by a [`GraphLoader`](crate::playbook::GraphLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    /// Playbook document does not exist.
    #[error("Playbook not found: {0}")]
    NotFound(PathBuf),

    /// Playbook document could not be parsed.
    #[error("Failed to parse playbook {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Playbook parsed but is structurally unusable.
    #[error("Invalid playbook: {0}")]
    Invalid(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort the conversion of a top-level playbook.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A playbook could not be read or parsed.
    #[error(transparent)]
    GraphLoad(#[from] LoadError),

    /// An edge points at a step id that is not part of the workflow.
    #[error("Playbook '{playbook}' references unknown step '{step}'")]
    MissingStep { playbook: String, step: String },

    /// A playbook step references a sub-playbook that does not exist.
    #[error("Step '{step}' references playbook '{reference}' which does not exist: {source}")]
    MissingPlaybook {
        step: String,
        reference: String,
        #[source]
        source: LoadError,
    },

    /// A sub-playbook embeds one of its own ancestors.
    #[error("Playbook embedding cycle: {}", chain.join(" -> "))]
    EmbeddingCycle { chain: Vec<String> },

    /// The operating system entropy source is unavailable.
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    /// An artifact could not be written.
    #[error("Failed to write {path}: {source}")]
    Emit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<serde_yaml::Error> for ConvertError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}
