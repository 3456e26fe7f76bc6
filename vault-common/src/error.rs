//! Common error types for the vault audit workspace

use thiserror::Error;

/// Common result type for vault audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the vault audit crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload rejected before parsing (wrong extension, absent file, empty selection)
    #[error("Invalid upload: {0}")]
    Validation(String),

    /// Workbook structurally unparseable (missing sheet, malformed parameters)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation requires a prior upload or audit that is not present
    #[error("Invalid state: {0}")]
    State(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
