//! The authorization gate: per-request evaluation of declared requirements.
//!
//! Evaluation order is fixed:
//!
//! 1. unknown operation → misconfiguration, never proceeds
//! 2. `AllowAnonymous` → proceed, nothing else is looked at
//! 3. no role and no permission requirement → proceed
//! 4. no user id → `Unauthenticated`
//! 5. roles (any one held is enough) → `Forbidden` naming the required roles,
//!    permissions are then not evaluated
//! 6. permissions (all must be held, in declared order, first miss stops) →
//!    `Forbidden` naming the missing permission
//!
//! The gate owns no mutable state. Its only suspension point is the resolver
//! call; dropping the returned future cancels that call, skips the handler and
//! records nothing.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::explain::{AuthorizationExplanation, CheckKind, CheckStep};
use crate::{
    OperationRegistry, Permission, PermissionResolver, RequestIdentity, ResolutionSource,
    ResolverError, Role,
};

/// Why an operation was allowed to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantReason {
    AllowAnonymous,
    NoRequirements,
    RequirementsMet,
}

impl GrantReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantReason::AllowAnonymous => "allow_anonymous",
            GrantReason::NoRequirements => "no_requirements",
            GrantReason::RequirementsMet => "requirements_met",
        }
    }
}

/// Why a permission requirement was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDenial {
    /// The resolver answered "not held".
    NotHeld,
    /// The resolver could not answer and had no usable cached value.
    ResolverUnavailable(ResolverError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: requires any of roles [{}]", role_list(.required))]
    ForbiddenRole { required: Vec<Role> },

    #[error("forbidden: missing permission '{permission}'")]
    ForbiddenPermission {
        permission: Permission,
        cause: PermissionDenial,
    },

    /// The operation was never registered. Treated as a server-side fault.
    #[error("operation '{0}' has no registered requirements")]
    UnknownOperation(String),
}

/// Boundary-facing classification of an [`AuthzError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthenticated,
    ForbiddenRole,
    ForbiddenPermission,
    Misconfigured,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthenticated => "unauthenticated",
            FailureKind::ForbiddenRole => "forbidden_role",
            FailureKind::ForbiddenPermission => "forbidden_permission",
            FailureKind::Misconfigured => "misconfigured",
        }
    }
}

impl AuthzError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthzError::Unauthenticated => FailureKind::Unauthenticated,
            AuthzError::ForbiddenRole { .. } => FailureKind::ForbiddenRole,
            AuthzError::ForbiddenPermission { .. } => FailureKind::ForbiddenPermission,
            AuthzError::UnknownOperation(_) => FailureKind::Misconfigured,
        }
    }

    /// The unmet requirement, as a display string, when there is one.
    pub fn unmet(&self) -> Option<String> {
        match self {
            AuthzError::ForbiddenRole { required } => Some(role_list(required)),
            AuthzError::ForbiddenPermission { permission, .. } => Some(permission.to_string()),
            AuthzError::Unauthenticated | AuthzError::UnknownOperation(_) => None,
        }
    }

    /// Resolver failure behind a permission denial, if that was the cause.
    pub fn resolver_failure(&self) -> Option<&ResolverError> {
        match self {
            AuthzError::ForbiddenPermission {
                cause: PermissionDenial::ResolverUnavailable(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pre-execution enforcement for every dispatched operation.
#[derive(Debug)]
pub struct AuthorizationGate<R> {
    registry: Arc<OperationRegistry>,
    resolver: R,
}

impl<R> AuthorizationGate<R> {
    pub fn new(registry: Arc<OperationRegistry>, resolver: R) -> Self {
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

impl<R: PermissionResolver> AuthorizationGate<R> {
    /// Evaluate `operation` for `identity` and log the decision.
    pub async fn authorize(
        &self,
        operation: &str,
        identity: &RequestIdentity,
    ) -> Result<GrantReason, AuthzError> {
        let mut steps = Vec::new();
        let outcome = self.evaluate(operation, identity, &mut steps).await;
        record_decision(operation, identity, &outcome, &steps);
        outcome
    }

    /// Authorize, then run `handler`. The handler is not even constructed
    /// when authorization fails.
    pub async fn run<F, Fut, T, E>(
        &self,
        operation: &str,
        identity: &RequestIdentity,
        handler: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthzError>,
    {
        self.authorize(operation, identity).await?;
        handler().await
    }

    /// Walk the same pipeline without raising or logging a decision.
    pub async fn explain(
        &self,
        operation: &str,
        identity: &RequestIdentity,
    ) -> AuthorizationExplanation {
        let mut steps = Vec::new();
        let outcome = self.evaluate(operation, identity, &mut steps).await;
        AuthorizationExplanation::new(operation, &outcome, steps)
    }

    async fn evaluate(
        &self,
        operation: &str,
        identity: &RequestIdentity,
        steps: &mut Vec<CheckStep>,
    ) -> Result<GrantReason, AuthzError> {
        let Some(descriptor) = self.registry.get(operation) else {
            steps.push(CheckStep::new(CheckKind::Registration, operation, false));
            return Err(AuthzError::UnknownOperation(operation.to_string()));
        };
        let requirements = descriptor.requirements();

        if requirements.allows_anonymous() {
            steps.push(CheckStep::new(CheckKind::AllowAnonymous, operation, true));
            return Ok(GrantReason::AllowAnonymous);
        }

        if requirements.is_unconstrained() {
            return Ok(GrantReason::NoRequirements);
        }

        let Some(user_id) = identity.user_id() else {
            steps.push(CheckStep::new(CheckKind::Authentication, "user_id", false));
            return Err(AuthzError::Unauthenticated);
        };
        steps.push(CheckStep::new(CheckKind::Authentication, user_id.to_string(), true));

        let required_roles = requirements.roles();
        if !required_roles.is_empty() {
            match identity.first_matching_role(required_roles) {
                Some(held) => steps.push(CheckStep::new(CheckKind::Role, held.as_str(), true)),
                None => {
                    steps.push(CheckStep::new(CheckKind::Role, role_list(required_roles), false));
                    return Err(AuthzError::ForbiddenRole {
                        required: required_roles.to_vec(),
                    });
                }
            }
        }

        for permission in requirements.permissions() {
            match self
                .resolver
                .resolve(user_id, identity.tenant_id(), permission)
                .await
            {
                Ok(resolution) if resolution.held => {
                    steps.push(
                        CheckStep::new(CheckKind::Permission, permission.as_str(), true)
                            .with_source(resolution.source),
                    );
                }
                Ok(resolution) => {
                    steps.push(
                        CheckStep::new(CheckKind::Permission, permission.as_str(), false)
                            .with_source(resolution.source),
                    );
                    return Err(AuthzError::ForbiddenPermission {
                        permission: permission.clone(),
                        cause: PermissionDenial::NotHeld,
                    });
                }
                Err(err) => {
                    steps.push(CheckStep::new(CheckKind::Permission, permission.as_str(), false));
                    return Err(AuthzError::ForbiddenPermission {
                        permission: permission.clone(),
                        cause: PermissionDenial::ResolverUnavailable(err),
                    });
                }
            }
        }

        Ok(GrantReason::RequirementsMet)
    }
}

fn record_decision(
    operation: &str,
    identity: &RequestIdentity,
    outcome: &Result<GrantReason, AuthzError>,
    steps: &[CheckStep],
) {
    let user_id = identity.user_id().map(|u| u.to_string());
    let tenant_id = identity.tenant_id().map(|t| t.to_string());

    match outcome {
        Ok(reason) => {
            let stale = steps
                .iter()
                .any(|s| s.source == Some(ResolutionSource::StaleCache));
            tracing::info!(
                target: "warden::authz",
                operation,
                outcome = "granted",
                reason = reason.as_str(),
                user_id = user_id.as_deref(),
                tenant_id = tenant_id.as_deref(),
                stale,
                "authorization granted"
            );
        }
        Err(err) => {
            let unmet = err.unmet();
            let resolver_error = err.resolver_failure().map(|e| e.to_string());
            tracing::warn!(
                target: "warden::authz",
                operation,
                outcome = "denied",
                kind = err.kind().as_str(),
                unmet = unmet.as_deref(),
                resolver_error = resolver_error.as_deref(),
                user_id = user_id.as_deref(),
                tenant_id = tenant_id.as_deref(),
                "authorization denied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use warden_core::{TenantId, UserId};

    use super::*;
    use crate::{Operation, Requirements, Resolution};

    /// Grants keyed by (user, tenant, permission); records every lookup.
    #[derive(Default)]
    struct ScriptedResolver {
        grants: HashSet<(UserId, TenantId, Permission)>,
        unavailable: bool,
        calls: Mutex<Vec<Permission>>,
    }

    impl ScriptedResolver {
        fn grant(mut self, user: UserId, tenant: TenantId, permission: &'static str) -> Self {
            self.grants.insert((user, tenant, Permission::new(permission)));
            self
        }

        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Permission> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PermissionResolver for ScriptedResolver {
        async fn resolve(
            &self,
            user_id: UserId,
            tenant_id: Option<TenantId>,
            permission: &Permission,
        ) -> Result<Resolution, ResolverError> {
            self.calls.lock().unwrap().push(permission.clone());
            if self.unavailable {
                return Err(ResolverError::Unavailable("connection refused".into()));
            }
            let held = tenant_id
                .map(|t| self.grants.contains(&(user_id, t, permission.clone())))
                .unwrap_or(false);
            Ok(Resolution::from_store(held))
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl PermissionResolver for NeverResolves {
        async fn resolve(
            &self,
            _user_id: UserId,
            _tenant_id: Option<TenantId>,
            _permission: &Permission,
        ) -> Result<Resolution, ResolverError> {
            std::future::pending().await
        }
    }

    macro_rules! operation {
        ($ty:ident, $name:literal, $reqs:expr) => {
            struct $ty;
            impl Operation for $ty {
                const NAME: &'static str = $name;
                type Output = ();
                fn requirements() -> Requirements {
                    $reqs
                }
            }
        };
    }

    operation!(Health, "system.health", Requirements::anonymous().role("Admin"));
    operation!(WhoAmI, "system.whoami", Requirements::none());
    operation!(CreateRole, "roles.create", Requirements::none().role("Admin"));
    operation!(
        DeletePermission,
        "permissions.delete",
        Requirements::none().permission("permissions.delete")
    );
    operation!(
        AuditedDelete,
        "audit.delete",
        Requirements::none()
            .role("Admin")
            .role("Auditor")
            .permission("audit.read")
            .permission("audit.delete")
    );

    fn gate<R: PermissionResolver>(resolver: R) -> AuthorizationGate<R> {
        let registry = OperationRegistry::builder()
            .register::<Health>()
            .register::<WhoAmI>()
            .register::<CreateRole>()
            .register::<DeletePermission>()
            .register::<AuditedDelete>()
            .build()
            .unwrap();
        AuthorizationGate::new(Arc::new(registry), resolver)
    }

    fn user_in(tenant: TenantId, roles: &[&'static str]) -> (UserId, RequestIdentity) {
        let user = UserId::new();
        let roles = roles.iter().map(|r| Role::new(*r)).collect();
        (user, RequestIdentity::authenticated(user, tenant, roles))
    }

    #[tokio::test]
    async fn anonymous_operation_proceeds_without_identity() {
        let gate = gate(ScriptedResolver::default());

        let reason = gate
            .authorize(Health::NAME, &RequestIdentity::anonymous())
            .await
            .unwrap();

        assert_eq!(reason, GrantReason::AllowAnonymous);
        assert!(gate.resolver().calls().is_empty());
    }

    #[tokio::test]
    async fn unconstrained_operation_proceeds() {
        let gate = gate(ScriptedResolver::default());
        let (_, identity) = user_in(TenantId::new(), &[]);

        assert_eq!(
            gate.authorize(WhoAmI::NAME, &identity).await.unwrap(),
            GrantReason::NoRequirements
        );
    }

    #[tokio::test]
    async fn missing_user_id_is_unauthenticated_for_any_requirement() {
        let gate = gate(ScriptedResolver::default());
        let tenant_only = RequestIdentity::new(None, Some(TenantId::new()), vec![Role::new("Admin")]);

        for op in [CreateRole::NAME, DeletePermission::NAME, AuditedDelete::NAME] {
            let err = gate.authorize(op, &tenant_only).await.unwrap_err();
            assert_eq!(err, AuthzError::Unauthenticated, "operation {op}");
        }
        assert!(gate.resolver().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_role_is_forbidden_and_skips_permissions() {
        let gate = gate(ScriptedResolver::default());
        let (_, identity) = user_in(TenantId::new(), &["User"]);

        let err = gate.authorize(CreateRole::NAME, &identity).await.unwrap_err();

        assert_eq!(
            err,
            AuthzError::ForbiddenRole {
                required: vec![Role::new("Admin")]
            }
        );
        assert_eq!(err.kind(), FailureKind::ForbiddenRole);
        assert_eq!(err.unmet().as_deref(), Some("Admin"));

        let err = gate.authorize(AuditedDelete::NAME, &identity).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ForbiddenRole);
        assert!(gate.resolver().calls().is_empty());
    }

    #[tokio::test]
    async fn any_listed_role_satisfies_rbac_case_insensitively() {
        let tenant = TenantId::new();
        let (user, identity) = user_in(tenant, &["auditor"]);
        let gate = gate(
            ScriptedResolver::default()
                .grant(user, tenant, "audit.read")
                .grant(user, tenant, "audit.delete"),
        );

        assert_eq!(
            gate.authorize(AuditedDelete::NAME, &identity).await.unwrap(),
            GrantReason::RequirementsMet
        );
    }

    #[tokio::test]
    async fn first_missing_permission_fails_fast() {
        let tenant = TenantId::new();
        let (user, identity) = user_in(tenant, &["Admin"]);
        let gate = gate(ScriptedResolver::default().grant(user, tenant, "audit.delete"));

        let err = gate.authorize(AuditedDelete::NAME, &identity).await.unwrap_err();

        assert_eq!(err.unmet().as_deref(), Some("audit.read"));
        assert!(matches!(
            err,
            AuthzError::ForbiddenPermission {
                cause: PermissionDenial::NotHeld,
                ..
            }
        ));
        assert_eq!(gate.resolver().calls(), vec![Permission::new("audit.read")]);
    }

    #[tokio::test]
    async fn grants_in_another_tenant_do_not_count() {
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let user = UserId::new();
        let gate = gate(ScriptedResolver::default().grant(user, tenant_a, "permissions.delete"));

        let in_a = RequestIdentity::authenticated(user, tenant_a, vec![]);
        let in_b = RequestIdentity::authenticated(user, tenant_b, vec![]);

        assert!(gate.authorize(DeletePermission::NAME, &in_a).await.is_ok());
        let err = gate.authorize(DeletePermission::NAME, &in_b).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ForbiddenPermission);
    }

    #[tokio::test]
    async fn absent_tenant_still_queries_the_resolver() {
        let user = UserId::new();
        let gate = gate(ScriptedResolver::default());
        let identity = RequestIdentity::new(Some(user), None, vec![]);

        let err = gate.authorize(DeletePermission::NAME, &identity).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::ForbiddenPermission);
        assert_eq!(gate.resolver().calls().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_resolver_fails_closed() {
        let gate = gate(ScriptedResolver::unavailable());
        let (_, identity) = user_in(TenantId::new(), &["Admin"]);
        let ran = AtomicBool::new(false);

        let result: Result<(), AuthzError> = gate
            .run(DeletePermission::NAME, &identity, || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ForbiddenPermission);
        assert!(err.resolver_failure().is_some());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_operation_never_proceeds() {
        let gate = gate(ScriptedResolver::default());
        let err = gate
            .authorize("tenants.purge", &RequestIdentity::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Misconfigured);
    }

    #[tokio::test]
    async fn cancelled_evaluation_does_not_run_handler() {
        let gate = gate(NeverResolves);
        let (_, identity) = user_in(TenantId::new(), &[]);
        let ran = AtomicBool::new(false);

        let guarded = gate.run(DeletePermission::NAME, &identity, || async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, AuthzError>(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(20), guarded).await;

        assert!(timed_out.is_err());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn explain_reports_steps_without_raising() {
        let tenant = TenantId::new();
        let (user, identity) = user_in(tenant, &["Admin"]);
        let gate = gate(ScriptedResolver::default().grant(user, tenant, "audit.read"));

        let explanation = gate.explain(AuditedDelete::NAME, &identity).await;

        assert!(!explanation.granted);
        assert_eq!(explanation.failure, Some(FailureKind::ForbiddenPermission));
        assert_eq!(explanation.unmet.as_deref(), Some("audit.delete"));
        let kinds: Vec<_> = explanation.steps.iter().map(|s| s.check).collect();
        assert_eq!(
            kinds,
            vec![
                CheckKind::Authentication,
                CheckKind::Role,
                CheckKind::Permission,
                CheckKind::Permission
            ]
        );
    }
}
