//! [`warden_auth::PermissionResolver`] implementations.

mod caching;
mod store_backed;

pub use caching::{CachingPermissionResolver, ResolverPolicy};
pub use store_backed::StoreBackedResolver;
