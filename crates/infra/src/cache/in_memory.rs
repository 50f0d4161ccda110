use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use warden_core::{TenantId, UserId};

use super::{CacheError, CacheKey, CachedPermission, PermissionCache};

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, CachedPermission>,
    tenant_generations: HashMap<TenantId, u64>,
    user_generations: HashMap<(TenantId, UserId), u64>,
}

impl State {
    fn generation(&self, tenant_id: TenantId, user_id: UserId) -> u64 {
        let tenant = self.tenant_generations.get(&tenant_id).copied().unwrap_or(0);
        let user = self
            .user_generations
            .get(&(tenant_id, user_id))
            .copied()
            .unwrap_or(0);
        tenant + user
    }
}

/// Process-local permission cache.
#[derive(Debug, Default)]
pub struct InMemoryPermissionCache {
    state: RwLock<State>,
}

impl InMemoryPermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Backend("cache lock poisoned".to_string())
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPermission>, CacheError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.entries.get(key).copied())
    }

    async fn generation(&self, tenant_id: TenantId, user_id: UserId) -> Result<u64, CacheError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.generation(tenant_id, user_id))
    }

    async fn put(
        &self,
        key: CacheKey,
        entry: CachedPermission,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.generation(key.tenant_id, key.user_id) != generation {
            return Ok(false);
        }
        state.entries.insert(key, entry);
        Ok(true)
    }

    async fn invalidate_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<(), CacheError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        *state.user_generations.entry((tenant_id, user_id)).or_default() += 1;
        state
            .entries
            .retain(|k, _| !(k.tenant_id == tenant_id && k.user_id == user_id));
        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        *state.tenant_generations.entry(tenant_id).or_default() += 1;
        state.entries.retain(|k, _| k.tenant_id != tenant_id);
        Ok(())
    }
}
