//! Operation execution pipeline: authorize, then handle.
//!
//! ```text
//! operation + identity
//!   ↓
//! 1. Gate: registry lookup, anonymous / role / permission checks
//!   ↓
//! 2. Handler: tenant-scoped directory logic (store + events)
//! ```
//!
//! A denied operation never reaches its handler. Dropping the returned
//! future cancels the pipeline at whatever stage it has reached.

use async_trait::async_trait;
use thiserror::Error;

use warden_auth::{
    AuthorizationExplanation, AuthorizationGate, AuthzError, Operation, PermissionResolver,
    RequestIdentity,
};
use warden_core::DomainError;
use warden_directory::operations::ExplainDecision;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The gate refused the operation.
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("tenant isolation: {0}")]
    TenantIsolation(String),

    /// The directory store failed underneath the handler.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                DispatchError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::NotFound(what) => DispatchError::NotFound(what),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => DispatchError::Conflict(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Executes one operation type once it has been authorized.
#[async_trait]
pub trait OperationHandler<O: Operation>: Send + Sync {
    async fn handle(
        &self,
        identity: &RequestIdentity,
        operation: O,
    ) -> Result<O::Output, DispatchError>;
}

/// Runs every operation through the [`AuthorizationGate`] before its handler.
#[derive(Debug)]
pub struct OperationDispatcher<R, H> {
    gate: AuthorizationGate<R>,
    handler: H,
}

impl<R, H> OperationDispatcher<R, H> {
    pub fn new(gate: AuthorizationGate<R>, handler: H) -> Self {
        Self { gate, handler }
    }

    pub fn gate(&self) -> &AuthorizationGate<R> {
        &self.gate
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<R: PermissionResolver, H> OperationDispatcher<R, H> {
    pub async fn dispatch<O>(
        &self,
        identity: &RequestIdentity,
        operation: O,
    ) -> Result<O::Output, DispatchError>
    where
        O: Operation,
        H: OperationHandler<O>,
    {
        self.gate
            .run(O::NAME, identity, || self.handler.handle(identity, operation))
            .await
    }

    /// Explain how the gate decides `request.operation` for `request.subject`.
    ///
    /// The caller must pass the gate for [`ExplainDecision`] and may only ask
    /// about identities in its own tenant.
    pub async fn explain(
        &self,
        caller: &RequestIdentity,
        request: ExplainDecision,
    ) -> Result<AuthorizationExplanation, DispatchError> {
        self.gate
            .run(ExplainDecision::NAME, caller, || async move {
                if request.subject.tenant_id() != caller.tenant_id() {
                    return Err(DispatchError::from(DomainError::tenant_isolation(
                        "cannot explain decisions for another tenant",
                    )));
                }
                Ok(self.gate.explain(&request.operation, &request.subject).await)
            })
            .await
    }
}
