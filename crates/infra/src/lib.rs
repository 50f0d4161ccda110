//! Infrastructure layer: directory storage, permission resolution and
//! caching, operation dispatch, and background workers.

pub mod cache;
pub mod dispatcher;
pub mod resolver;
pub mod service;
pub mod store;
pub mod workers;

pub use cache::{CacheError, CacheKey, CachedPermission, InMemoryPermissionCache, PermissionCache};
#[cfg(feature = "redis")]
pub use cache::RedisPermissionCache;
pub use dispatcher::{DispatchError, OperationDispatcher, OperationHandler};
pub use resolver::{CachingPermissionResolver, ResolverPolicy, StoreBackedResolver};
pub use service::{BootstrapReport, DirectoryService};
pub use store::{DirectoryStore, InMemoryDirectoryStore, StoreError, StoreResult};
pub use workers::{CacheInvalidationWorker, WorkerError, WorkerHandle};

#[cfg(test)]
mod integration_tests;
