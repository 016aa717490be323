use serde::{Deserialize, Serialize};

use stockwise_core::{TenantId, TenantKind, UserId};

/// State of one tenant axis. There is no other state: a user with an
/// available tenant always ends up `Active`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "tenant_id", rename_all = "snake_case")]
pub enum TenantState {
    Unset,
    Active(TenantId),
}

impl TenantState {
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            TenantState::Unset => None,
            TenantState::Active(id) => Some(*id),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TenantState::Active(_))
    }
}

impl From<Option<TenantId>> for TenantState {
    fn from(value: Option<TenantId>) -> Self {
        value.map_or(TenantState::Unset, TenantState::Active)
    }
}

/// Persisted per-user context: weak references to the current store and
/// warehouse.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub current_store_id: Option<TenantId>,
    pub current_warehouse_id: Option<TenantId>,
}

impl TenantContext {
    pub fn get(&self, kind: TenantKind) -> Option<TenantId> {
        match kind {
            TenantKind::Store => self.current_store_id,
            TenantKind::Warehouse => self.current_warehouse_id,
        }
    }

    pub fn set(&mut self, kind: TenantKind, tenant: Option<TenantId>) {
        match kind {
            TenantKind::Store => self.current_store_id = tenant,
            TenantKind::Warehouse => self.current_warehouse_id = tenant,
        }
    }

    pub fn state(&self, kind: TenantKind) -> TenantState {
        self.get(kind).into()
    }
}

/// Tenant context for a request.
///
/// A snapshot taken when the request starts; switches made by concurrent
/// requests are not visible through it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestScope {
    user_id: UserId,
    context: TenantContext,
}

impl RequestScope {
    pub fn new(user_id: UserId, context: TenantContext) -> Self {
        Self { user_id, context }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn context(&self) -> TenantContext {
        self.context
    }

    pub fn tenant(&self, kind: TenantKind) -> Option<TenantId> {
        self.context.get(kind)
    }

    pub(crate) fn replace(&mut self, kind: TenantKind, state: TenantState) {
        self.context.set(kind, state.tenant_id());
    }
}
