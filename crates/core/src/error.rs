//! Domain error model.

use thiserror::Error;

/// Result type used across the directory domain.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures raised by directory records and their handlers.
///
/// Authorization failures are *not* modelled here; they belong to the gate
/// in `warden-auth` and are classified separately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty name, bad email, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record-level rule was violated (e.g. deleting a system role).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness clash (duplicate permission name in a tenant, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A record from one tenant was addressed through another tenant's scope.
    #[error("tenant isolation: {0}")]
    TenantIsolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn tenant_isolation(msg: impl Into<String>) -> Self {
        Self::TenantIsolation(msg.into())
    }
}
