//! Core error types for flashcards-core.
//!
//! This module defines the error hierarchy using thiserror. Study errors are
//! user-input class and never retried; the CLI turns them into messages.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for flashcards-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scheduler errors raised while studying a deck
    #[error(transparent)]
    Study(#[from] StudyError),

    /// Template errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stored record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Errors raised by schedulers and the scheduler registry.
#[derive(Error, Debug)]
pub enum StudyError {
    /// The deck has no cards to select from
    #[error("Deck '{deck_id}' has no cards to study")]
    EmptyDeck { deck_id: String },

    /// The card or side named in an outcome does not exist in the deck
    #[error("Card '{card_id}' has no side '{side}' in this deck")]
    NotFound { card_id: String, side: String },

    /// No scheduler is registered under this name
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A card references a template missing from the catalog
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Rendering the question or answer failed
    #[error("Failed to render card '{card_id}': {source}")]
    Render {
        card_id: String,
        #[source]
        source: TemplateError,
    },
}

/// Template parsing and rendering errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Pattern does not parse
    #[error("Template syntax error: {0}")]
    Syntax(String),

    /// Pattern parsed but rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Template definition is not usable
    #[error("Invalid template: {0}")]
    Invalid(String),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::SyntaxError => TemplateError::Syntax(err.to_string()),
            _ => TemplateError::Render(err.to_string()),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A uniquely named record already exists
    #[error("{kind} named '{name}' already exists")]
    Conflict { kind: &'static str, name: String },

    /// Record is still referenced and cannot be removed
    #[error("{kind} '{id}' is used by {count} card(s)")]
    InUse {
        kind: &'static str,
        id: String,
        count: u64,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory cannot be determined or created
    #[error("Failed to access data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Required field is empty
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
