use thiserror::Error;
use tracing::{debug, info, warn};

use stockwise_core::{SourceError, TenantId, TenantKind, UserId};

use crate::{ActiveTenants, RequestScope, TenantContext, TenantContextStore, TenantState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenancyError {
    #[error("user {user_id} cannot access {kind} {tenant_id}")]
    InvalidTenant {
        user_id: UserId,
        kind: TenantKind,
        tenant_id: TenantId,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Resolves, persists and switches the current store/warehouse of a user.
///
/// Both axes follow the same two-state machine (`Unset → Active`); the
/// resolver holds no state of its own between calls.
#[derive(Debug)]
pub struct TenantContextResolver<S, A> {
    store: S,
    tenants: A,
}

impl<S, A> TenantContextResolver<S, A>
where
    S: TenantContextStore,
    A: ActiveTenants,
{
    pub fn new(store: S, tenants: A) -> Self {
        Self { store, tenants }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tenants(&self) -> &A {
        &self.tenants
    }

    pub fn current(&self, user_id: UserId) -> Result<TenantContext, TenancyError> {
        Ok(self.store.load(user_id)?)
    }

    /// Make sure every axis is `Active` when the user has any active tenant.
    ///
    /// Idempotent: axes that are already set are neither looked up nor
    /// written. An axis with no available tenant stays `Unset`.
    pub fn ensure_context(&self, user_id: UserId) -> Result<TenantContext, TenancyError> {
        let mut context = self.store.load(user_id)?;
        for kind in TenantKind::ALL {
            if context.get(kind).is_none() {
                let state = self.select_first(user_id, kind)?;
                context.set(kind, state.tenant_id());
            }
        }
        Ok(context)
    }

    /// Single-axis variant of [`Self::ensure_context`].
    pub fn ensure(&self, user_id: UserId, kind: TenantKind) -> Result<TenantState, TenancyError> {
        let context = self.store.load(user_id)?;
        match context.state(kind) {
            active @ TenantState::Active(_) => Ok(active),
            TenantState::Unset => self.select_first(user_id, kind),
        }
    }

    /// Ensure the context and snapshot it for the rest of the request.
    pub fn begin_request(&self, user_id: UserId) -> Result<RequestScope, TenancyError> {
        let context = self.ensure_context(user_id)?;
        Ok(RequestScope::new(user_id, context))
    }

    /// Switch the current tenant of one axis.
    ///
    /// Fails with [`TenancyError::InvalidTenant`] (leaving the persisted
    /// context untouched) when `tenant_id` is not among the user's active
    /// tenants.
    pub fn switch(
        &self,
        user_id: UserId,
        kind: TenantKind,
        tenant_id: TenantId,
    ) -> Result<TenantState, TenancyError> {
        let available = self.tenants.active_tenants(user_id, kind)?;
        if !available.contains(&tenant_id) {
            warn!(user_id = %user_id, kind = %kind, tenant_id = %tenant_id, "rejected tenant switch");
            return Err(TenancyError::InvalidTenant {
                user_id,
                kind,
                tenant_id,
            });
        }

        self.store.save_current(user_id, kind, Some(tenant_id))?;
        info!(user_id = %user_id, kind = %kind, tenant_id = %tenant_id, "switched tenant");
        Ok(TenantState::Active(tenant_id))
    }

    /// [`Self::switch`] and reflect the result in the caller's own scope.
    pub fn switch_in_scope(
        &self,
        scope: &mut RequestScope,
        kind: TenantKind,
        tenant_id: TenantId,
    ) -> Result<TenantState, TenancyError> {
        let state = self.switch(scope.user_id(), kind, tenant_id)?;
        scope.replace(kind, state);
        Ok(state)
    }

    /// Clear the current tenant of an axis when it has been deactivated (no
    /// longer among the active tenants). Returns whether it was cleared.
    pub fn clear_if_deactivated(
        &self,
        user_id: UserId,
        kind: TenantKind,
    ) -> Result<bool, TenancyError> {
        let Some(current) = self.store.load(user_id)?.get(kind) else {
            return Ok(false);
        };
        let available = self.tenants.active_tenants(user_id, kind)?;
        if available.contains(&current) {
            return Ok(false);
        }

        self.store.save_current(user_id, kind, None)?;
        info!(user_id = %user_id, kind = %kind, tenant_id = %current, "cleared deactivated tenant");
        Ok(true)
    }

    fn select_first(&self, user_id: UserId, kind: TenantKind) -> Result<TenantState, TenancyError> {
        let available = self.tenants.active_tenants(user_id, kind)?;
        let Some(first) = available.first().copied() else {
            debug!(user_id = %user_id, kind = %kind, "no active tenant available");
            return Ok(TenantState::Unset);
        };

        self.store.save_current(user_id, kind, Some(first))?;
        info!(user_id = %user_id, kind = %kind, tenant_id = %first, "auto-selected tenant");
        Ok(TenantState::Active(first))
    }
}
