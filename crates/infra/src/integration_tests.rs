//! End-to-end pipeline tests.
//!
//! Identity → Gate → Resolver (cache → store) → Handler → Store → Bus →
//! cache invalidation.

use std::sync::Arc;
use std::time::Duration;

use warden_auth::{AuthorizationGate, AuthzError, RequestIdentity, Role};
use warden_core::{TenantId, UserId};
use warden_directory::operations::{
    ActivateUser, AssignRoleToUser, CreatePermission, CreateRole, CreateTenant, CreateUser, DeleteRole,
    ExplainDecision, GetTenant, ListRoles, ListTenants, ListUsers, RevokeRoleFromUser, SuspendUser,
    WhoAmI,
};
use warden_directory::{DirectoryEvent, operation_registry};
use warden_events::{EventEnvelope, InMemoryEventBus};

use crate::{
    BootstrapReport, CacheInvalidationWorker, CachingPermissionResolver, DirectoryService,
    DispatchError, InMemoryDirectoryStore, InMemoryPermissionCache, OperationDispatcher,
    ResolverPolicy, StoreBackedResolver,
};

type Bus = Arc<InMemoryEventBus<EventEnvelope<DirectoryEvent>>>;
type Resolver =
    CachingPermissionResolver<StoreBackedResolver<InMemoryDirectoryStore>, Arc<InMemoryPermissionCache>>;
type Dispatcher = OperationDispatcher<Resolver, DirectoryService<InMemoryDirectoryStore, Bus>>;

struct Harness {
    dispatcher: Dispatcher,
    bus: Bus,
    cache: Arc<InMemoryPermissionCache>,
    acme: BootstrapReport,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let cache = Arc::new(InMemoryPermissionCache::new());

        let resolver = CachingPermissionResolver::new(
            StoreBackedResolver::new(store.clone()),
            cache.clone(),
            ResolverPolicy {
                fresh_ttl: Duration::from_secs(60),
                ..ResolverPolicy::default()
            },
        );
        let registry = Arc::new(operation_registry().unwrap());
        let service = DirectoryService::new(store, bus.clone());
        let acme = service
            .bootstrap_tenant("Acme", "acme", "admin@acme.test")
            .await
            .unwrap();

        Self {
            dispatcher: OperationDispatcher::new(AuthorizationGate::new(registry, resolver), service),
            bus,
            cache,
            acme,
        }
    }

    fn admin(&self) -> RequestIdentity {
        RequestIdentity::authenticated(self.acme.admin.id, self.acme.tenant.id, vec![Role::new("admin")])
    }
}

#[tokio::test]
async fn bootstrap_admin_manages_the_directory() {
    let h = Harness::new().await;
    let admin = h.admin();

    let bob = h
        .dispatcher
        .dispatch(
            &admin,
            CreateUser {
                email: "bob@acme.test".into(),
                display_name: "Bob".into(),
            },
        )
        .await
        .unwrap();
    let users = h.dispatcher.dispatch(&admin, ListUsers).await.unwrap();
    assert_eq!(users.len(), 2);

    let auditor = h
        .dispatcher
        .dispatch(
            &admin,
            CreateRole {
                name: "Auditor".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    h.dispatcher
        .dispatch(
            &admin,
            AssignRoleToUser {
                user_id: bob.id,
                role_id: auditor.id,
            },
        )
        .await
        .unwrap();

    let roles = h.dispatcher.dispatch(&admin, ListRoles).await.unwrap();
    assert_eq!(roles.len(), 3);

    h.dispatcher
        .dispatch(&admin, CreatePermission {
            name: "audit.read".into(),
            description: "Read the audit trail".into(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn plain_users_are_refused_admin_operations() {
    let h = Harness::new().await;
    let admin = h.admin();
    let carol = h
        .dispatcher
        .dispatch(&admin, CreateUser {
            email: "carol@acme.test".into(),
            display_name: "Carol".into(),
        })
        .await
        .unwrap();
    let identity = RequestIdentity::authenticated(carol.id, h.acme.tenant.id, vec![Role::new("User")]);

    let err = h
        .dispatcher
        .dispatch(&identity, CreateRole {
            name: "Sneaky".into(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::ForbiddenRole { .. })));

    // Carol has no memberships in the store, so even users.read is missing.
    let err = h.dispatcher.dispatch(&identity, ListUsers).await.unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::ForbiddenPermission { .. })));
}

#[tokio::test]
async fn anonymous_callers_can_only_ask_who_they_are() {
    let h = Harness::new().await;
    let anonymous = RequestIdentity::anonymous();

    let me = h.dispatcher.dispatch(&anonymous, WhoAmI).await.unwrap();
    assert!(!me.is_authenticated());

    let err = h.dispatcher.dispatch(&anonymous, ListUsers).await.unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::Unauthenticated)));
}

#[tokio::test]
async fn system_roles_cannot_be_deleted() {
    let h = Harness::new().await;
    let admin = h.admin();
    let roles = h.dispatcher.dispatch(&admin, ListRoles).await.unwrap();
    let admin_role = roles.iter().find(|r| r.name.as_str() == "Admin").unwrap();

    let err = h
        .dispatcher
        .dispatch(&admin, DeleteRole { role_id: admin_role.id })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));
}

#[tokio::test]
async fn other_tenants_are_out_of_reach() {
    let h = Harness::new().await;
    let admin = h.admin();

    let err = h
        .dispatcher
        .dispatch(&admin, GetTenant { tenant_id: TenantId::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::TenantIsolation(_)));

    // The admin's grants do not travel to another tenant.
    let elsewhere = RequestIdentity::authenticated(h.acme.admin.id, TenantId::new(), vec![Role::new("Admin")]);
    let err = h.dispatcher.dispatch(&elsewhere, ListUsers).await.unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::ForbiddenPermission { .. })));
}

#[tokio::test]
async fn duplicate_emails_conflict() {
    let h = Harness::new().await;
    let err = h
        .dispatcher
        .dispatch(&h.admin(), CreateUser {
            email: "ADMIN@acme.test".into(),
            display_name: "Impostor".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn revoking_a_role_invalidates_cached_permissions() {
    let h = Harness::new().await;
    let admin = h.admin();
    let worker = CacheInvalidationWorker::spawn("cache-invalidation", &h.bus, h.cache.clone()).unwrap();

    let dave = h
        .dispatcher
        .dispatch(&admin, CreateUser {
            email: "dave@acme.test".into(),
            display_name: "Dave".into(),
        })
        .await
        .unwrap();
    let roles = h.dispatcher.dispatch(&admin, ListRoles).await.unwrap();
    let user_role = roles.iter().find(|r| r.name.as_str() == "User").unwrap().id;
    h.dispatcher
        .dispatch(&admin, AssignRoleToUser { user_id: dave.id, role_id: user_role })
        .await
        .unwrap();

    let identity = RequestIdentity::authenticated(dave.id, h.acme.tenant.id, vec![Role::new("User")]);
    assert!(h.dispatcher.dispatch(&identity, ListUsers).await.is_ok());

    h.dispatcher
        .dispatch(&admin, RevokeRoleFromUser { user_id: dave.id, role_id: user_role })
        .await
        .unwrap();

    let mut denied = false;
    for _ in 0..100 {
        if h.dispatcher.dispatch(&identity, ListUsers).await.is_err() {
            denied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(denied, "revocation was never observed");

    tokio::task::spawn_blocking(move || worker.shutdown()).await.unwrap();
}

#[tokio::test]
async fn suspended_users_lose_their_permissions() {
    let h = Harness::new().await;
    let admin = h.admin();
    let erin = h
        .dispatcher
        .dispatch(&admin, CreateUser {
            email: "erin@acme.test".into(),
            display_name: "Erin".into(),
        })
        .await
        .unwrap();
    let roles = h.dispatcher.dispatch(&admin, ListRoles).await.unwrap();
    let user_role = roles.iter().find(|r| r.name.as_str() == "User").unwrap().id;
    h.dispatcher
        .dispatch(&admin, AssignRoleToUser { user_id: erin.id, role_id: user_role })
        .await
        .unwrap();
    h.dispatcher
        .dispatch(&admin, SuspendUser { user_id: erin.id })
        .await
        .unwrap();

    // No invalidation worker here and nothing cached for Erin yet.
    let identity = RequestIdentity::authenticated(erin.id, h.acme.tenant.id, vec![Role::new("User")]);
    assert!(h.dispatcher.dispatch(&identity, ListUsers).await.is_err());

    let err = h
        .dispatcher
        .dispatch(&admin, SuspendUser { user_id: h.acme.admin.id })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reactivated_users_regain_their_grants() {
    let h = Harness::new().await;
    let admin = h.admin();
    let worker = CacheInvalidationWorker::spawn("cache-invalidation", &h.bus, h.cache.clone()).unwrap();

    let frank = h
        .dispatcher
        .dispatch(&admin, CreateUser {
            email: "frank@acme.test".into(),
            display_name: "Frank".into(),
        })
        .await
        .unwrap();
    let roles = h.dispatcher.dispatch(&admin, ListRoles).await.unwrap();
    let user_role = roles.iter().find(|r| r.name.as_str() == "User").unwrap().id;
    h.dispatcher
        .dispatch(&admin, AssignRoleToUser { user_id: frank.id, role_id: user_role })
        .await
        .unwrap();
    h.dispatcher
        .dispatch(&admin, SuspendUser { user_id: frank.id })
        .await
        .unwrap();

    let identity = RequestIdentity::authenticated(frank.id, h.acme.tenant.id, vec![Role::new("User")]);
    assert!(h.dispatcher.dispatch(&identity, ListUsers).await.is_err());

    let frank = h
        .dispatcher
        .dispatch(&admin, ActivateUser { user_id: frank.id })
        .await
        .unwrap();
    assert_eq!(frank.status, warden_directory::UserStatus::Active);

    let mut allowed = false;
    for _ in 0..100 {
        if h.dispatcher.dispatch(&identity, ListUsers).await.is_ok() {
            allowed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(allowed, "reactivation was never observed");

    let err = h
        .dispatcher
        .dispatch(&admin, ActivateUser { user_id: frank.id })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));

    tokio::task::spawn_blocking(move || worker.shutdown()).await.unwrap();
}

#[tokio::test]
async fn platform_admins_create_seeded_tenants() {
    let h = Harness::new().await;
    let platform = RequestIdentity::new(Some(UserId::new()), None, vec![Role::new("SuperAdmin")]);

    let globex = h
        .dispatcher
        .dispatch(&platform, CreateTenant {
            name: "Globex".into(),
            slug: "Globex-EU".into(),
        })
        .await
        .unwrap();
    assert_eq!(globex.slug, "globex-eu");

    let tenants = h.dispatcher.dispatch(&platform, ListTenants).await.unwrap();
    assert_eq!(tenants.len(), 2);

    // Tenant admins are not platform admins.
    let err = h.dispatcher.dispatch(&h.admin(), ListTenants).await.unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::ForbiddenRole { .. })));

    let err = h
        .dispatcher
        .dispatch(&platform, CreateTenant {
            name: "Globex again".into(),
            slug: "globex-eu".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Conflict(_)));
}

#[tokio::test]
async fn admins_can_explain_decisions_in_their_tenant() {
    let h = Harness::new().await;
    let admin = h.admin();
    let stranger = RequestIdentity::authenticated(UserId::new(), h.acme.tenant.id, vec![Role::new("User")]);

    let explanation = h
        .dispatcher
        .explain(&admin, ExplainDecision {
            operation: "users.list".into(),
            subject: stranger.clone(),
        })
        .await
        .unwrap();
    assert!(!explanation.granted);
    assert_eq!(explanation.unmet.as_deref(), Some("users.read"));

    let err = h
        .dispatcher
        .explain(&stranger, ExplainDecision {
            operation: "users.list".into(),
            subject: admin.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Authz(AuthzError::ForbiddenRole { .. })));

    let elsewhere = RequestIdentity::authenticated(UserId::new(), TenantId::new(), vec![]);
    let err = h
        .dispatcher
        .explain(&admin, ExplainDecision {
            operation: "users.list".into(),
            subject: elsewhere,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::TenantIsolation(_)));
}
