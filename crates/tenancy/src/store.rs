//! Collaborators of the resolver: context persistence and active-tenant lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockwise_core::{SourceError, SourceResult, TenantId, TenantKind, UserId};

use crate::TenantContext;

/// Persistence of the two current-tenant scalars on the user record.
///
/// Each `save_current` is a single scalar write; concurrent writers for the
/// same user resolve as last-writer-wins.
pub trait TenantContextStore: Send + Sync {
    fn load(&self, user_id: UserId) -> SourceResult<TenantContext>;
    fn save_current(
        &self,
        user_id: UserId,
        kind: TenantKind,
        tenant: Option<TenantId>,
    ) -> SourceResult<()>;
}

impl<S> TenantContextStore for Arc<S>
where
    S: TenantContextStore + ?Sized,
{
    fn load(&self, user_id: UserId) -> SourceResult<TenantContext> {
        (**self).load(user_id)
    }

    fn save_current(
        &self,
        user_id: UserId,
        kind: TenantKind,
        tenant: Option<TenantId>,
    ) -> SourceResult<()> {
        (**self).save_current(user_id, kind, tenant)
    }
}

/// Tenants a user may currently act in, in the order the provider chooses.
/// Only active (not deactivated) tenants are returned.
pub trait ActiveTenants: Send + Sync {
    fn active_tenants(&self, user_id: UserId, kind: TenantKind) -> SourceResult<Vec<TenantId>>;
}

impl<A> ActiveTenants for Arc<A>
where
    A: ActiveTenants + ?Sized,
{
    fn active_tenants(&self, user_id: UserId, kind: TenantKind) -> SourceResult<Vec<TenantId>> {
        (**self).active_tenants(user_id, kind)
    }
}

#[derive(Debug, Default)]
struct StoredContext {
    context: TenantContext,
    writes: u64,
}

/// In-memory context store for tests/dev. Counts writes per user.
#[derive(Debug, Default)]
pub struct InMemoryTenantContextStore {
    inner: RwLock<HashMap<UserId, StoredContext>>,
}

impl InMemoryTenantContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_current` calls recorded for a user.
    pub fn writes(&self, user_id: UserId) -> SourceResult<u64> {
        let map = self
            .inner
            .read()
            .map_err(|_| SourceError::poisoned("tenant context"))?;
        Ok(map.get(&user_id).map_or(0, |s| s.writes))
    }
}

impl TenantContextStore for InMemoryTenantContextStore {
    fn load(&self, user_id: UserId) -> SourceResult<TenantContext> {
        let map = self
            .inner
            .read()
            .map_err(|_| SourceError::poisoned("tenant context"))?;
        Ok(map.get(&user_id).map(|s| s.context).unwrap_or_default())
    }

    fn save_current(
        &self,
        user_id: UserId,
        kind: TenantKind,
        tenant: Option<TenantId>,
    ) -> SourceResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| SourceError::poisoned("tenant context"))?;
        let stored = map.entry(user_id).or_default();
        stored.context.set(kind, tenant);
        stored.writes += 1;
        Ok(())
    }
}

/// In-memory active-tenant lookup for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryActiveTenants {
    inner: RwLock<HashMap<(UserId, TenantKind), Vec<TenantId>>>,
}

impl InMemoryActiveTenants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ordered active-tenant list for a user and axis.
    pub fn set(&self, user_id: UserId, kind: TenantKind, tenants: Vec<TenantId>) -> SourceResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| SourceError::poisoned("active tenants"))?;
        map.insert((user_id, kind), tenants);
        Ok(())
    }

    /// Drop a tenant from every user's list (tenant deactivated).
    pub fn deactivate(&self, kind: TenantKind, tenant: TenantId) -> SourceResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| SourceError::poisoned("active tenants"))?;
        for ((_, k), tenants) in map.iter_mut() {
            if *k == kind {
                tenants.retain(|t| *t != tenant);
            }
        }
        Ok(())
    }
}

impl ActiveTenants for InMemoryActiveTenants {
    fn active_tenants(&self, user_id: UserId, kind: TenantKind) -> SourceResult<Vec<TenantId>> {
        let map = self
            .inner
            .read()
            .map_err(|_| SourceError::poisoned("active tenants"))?;
        Ok(map.get(&(user_id, kind)).cloned().unwrap_or_default())
    }
}
