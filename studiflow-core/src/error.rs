//! Error types for studiflow-core.

use thiserror::Error;

/// Result type alias using studiflow-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for scheduling and automation operations
#[derive(Error, Debug)]
pub enum Error {
    // Strategy errors
    #[error("Unknown engagement strategy: {0}")]
    UnknownStrategy(String),

    // Session errors
    #[error("A session is already running: {0}. Stop it before starting a new one.")]
    SessionActive(String),

    #[error("No automation session exists")]
    NoSession,

    // Configuration errors
    #[error("Invalid schedule configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid time of day: {0}. Expected HH:MM.")]
    InvalidTimeOfDay(String),

    // Collaborator errors
    #[error("Publishing failed: {0}")]
    Publish(String),

    #[error("Targeting service error: {0}")]
    Targeting(String),

    #[error("Content source error: {0}")]
    ContentSource(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
