//! Error types for eventdash-core

use thiserror::Error;

/// Main error type for the eventdash-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Local store error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote store/API error
    #[error("store error ({status}): {message}")]
    Store { status: u16, message: String },

    /// Event not found
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Table name that no store knows about
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Export entity that does not map to a table
    #[error("unknown export entity: {0}")]
    UnknownEntity(String),
}

impl Error {
    /// Build a store error for a failed request that never got a status.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Store {
            status: 0,
            message: message.into(),
        }
    }
}

/// Result type alias for eventdash-core
pub type Result<T> = std::result::Result<T, Error>;
