//! Background workers.

mod cache_invalidation;

pub use cache_invalidation::{CacheInvalidationWorker, WorkerError, WorkerHandle};
