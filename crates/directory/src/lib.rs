//! `warden-directory`: tenants, users, roles, permissions and the grants
//! between them, plus every administrative operation with its declared
//! authorization requirements.

pub mod catalog;
pub mod events;
pub mod grants;
pub mod operations;
pub mod permission;
pub mod role;
pub mod tenant;
pub mod user;

pub use events::{DirectoryEvent, InvalidationScope};
pub use grants::{RolePermissionGrant, UserPermissionGrant, UserRoleMembership};
pub use operations::operation_registry;
pub use permission::PermissionDefinition;
pub use role::RoleDefinition;
pub use tenant::Tenant;
pub use user::{User, UserStatus};
