//! Domain and persistence error models.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type returned by storage ports.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Domain-level error.
///
/// Deterministic input failures (validation, bad ids, conflicts). Storage
/// failures are `PersistenceError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure, non-positive).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (duplicate identity, record still referenced).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Storage operation error.
///
/// These are **infrastructure errors** (connectivity, constraints, decoding) as
/// opposed to domain errors. Backends map their native errors into this enum so
/// the domain crates never depend on a driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A uniqueness or referential constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The backend could not be reached (pool closed, connection lost).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A row could not be decoded into a domain value.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Any other query/execution failure.
    #[error("query failed: {0}")]
    Query(String),
}
