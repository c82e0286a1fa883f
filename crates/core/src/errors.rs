//! Core error types for the reconciliation engine.
//!
//! This module defines storage- and transport-agnostic error types. Errors
//! raised by the SQLite store or the RPC event source are converted to these
//! types at the crate boundary.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Event source failed: {0}")]
    EventSource(#[from] EventSourceError),

    /// A persisted record could not be decoded into its domain shape.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Cannot run {phase} while engine is {state}")]
    InvalidPhase { phase: String, state: String },

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether a retry with backoff may succeed.
    ///
    /// Integrity, configuration and lifecycle errors are never transient;
    /// neither is an already exhausted retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(e) => e.is_transient(),
            Error::EventSource(e) => e.is_transient(),
            Error::DataIntegrity(_)
            | Error::RetriesExhausted { .. }
            | Error::InvalidPhase { .. }
            | Error::InvalidConfigValue(_)
            | Error::MissingConfigKey(_)
            | Error::Unexpected(_) => false,
        }
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The database was locked by another writer.
    #[error("Database busy: {0}")]
    Busy(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DatabaseError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_)
                | DatabaseError::PoolCreationFailed(_)
                | DatabaseError::QueryFailed(_)
                | DatabaseError::Busy(_)
                | DatabaseError::TransactionFailed(_)
        )
    }
}

/// Errors raised while acquiring or draining an asset's event stream.
#[derive(Error, Debug, Clone)]
pub enum EventSourceError {
    /// No event source is registered for the asset.
    #[error("No event source configured for asset {0}")]
    UnknownAsset(String),

    /// The transport to the ledger node failed (connection reset, DNS, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node rejected the request. Retrying the same request cannot help.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node rate limited the request.
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// The request timed out.
    #[error("Timed out talking to {0}")]
    Timeout(String),

    /// An event could not be decoded.
    #[error("Failed to decode event: {0}")]
    Decode(String),
}

impl EventSourceError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventSourceError::Transport(_)
                | EventSourceError::RateLimited(_)
                | EventSourceError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DataIntegrity(err.to_string())
    }
}
