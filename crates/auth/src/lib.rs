//! `warden-auth`: the authorization enforcement pipeline.
//!
//! - [`Requirements`]: what an operation type declares
//! - [`OperationRegistry`]: operation name → requirements, frozen at startup
//! - [`RequestIdentity`]: who is calling (passed explicitly, never ambient)
//! - [`PermissionResolver`]: tenant-scoped permission lookups
//! - [`AuthorizationGate`]: evaluates the above before any handler runs
//!
//! Independent of HTTP and of any particular store.

pub mod claims;
pub mod explain;
pub mod gate;
pub mod identity;
pub mod operation;
pub mod permissions;
pub mod requirement;
pub mod resolver;
pub mod roles;

pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use explain::{AuthorizationExplanation, CheckKind, CheckStep};
pub use gate::{AuthorizationGate, AuthzError, FailureKind, GrantReason, PermissionDenial};
pub use identity::RequestIdentity;
pub use operation::{Operation, OperationDescriptor, OperationRegistry, OperationRegistryBuilder, RegistryError};
pub use permissions::Permission;
pub use requirement::{Requirement, Requirements};
pub use resolver::{PermissionResolver, Resolution, ResolutionSource, ResolverError};
pub use roles::Role;
