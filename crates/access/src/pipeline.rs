use tracing::debug;

use stockwise_auth::{PermissionAggregator, PermissionSource};
use stockwise_core::{TenantId, TenantKind, UserId};
use stockwise_query::{AllowedSpec, DataSource, PagedResult, QuerySpec, ScopedQueryEngine};
use stockwise_tenancy::{ActiveTenants, TenantContextResolver, TenantContextStore, TenantState};

use crate::{AccessConfig, AccessError, RequestContext};

/// Request-scoped access control over injected collaborators.
///
/// Holds no per-user state: permissions are reloaded and the matrix rebuilt
/// on every [`AccessPipeline::begin`].
#[derive(Debug)]
pub struct AccessPipeline<P, S, A> {
    permissions: P,
    aggregator: PermissionAggregator,
    resolver: TenantContextResolver<S, A>,
    engine: ScopedQueryEngine,
}

impl<P, S, A> AccessPipeline<P, S, A>
where
    P: PermissionSource,
    S: TenantContextStore,
    A: ActiveTenants,
{
    pub fn new(config: &AccessConfig, permissions: P, store: S, tenants: A) -> Self {
        Self {
            permissions,
            aggregator: config.aggregator(),
            resolver: TenantContextResolver::new(store, tenants),
            engine: config.engine(),
        }
    }

    pub fn resolver(&self) -> &TenantContextResolver<S, A> {
        &self.resolver
    }

    pub fn engine(&self) -> &ScopedQueryEngine {
        &self.engine
    }

    /// Start a request: aggregate permissions and ensure the tenant context.
    pub fn begin(&self, user_id: UserId) -> Result<RequestContext, AccessError> {
        let grants = self.permissions.load(user_id)?;
        let permissions = self.aggregator.aggregate(&grants);
        let scope = self.resolver.begin_request(user_id)?;

        debug!(
            user_id = %user_id,
            store = ?scope.tenant(TenantKind::Store).map(TenantId::get),
            warehouse = ?scope.tenant(TenantKind::Warehouse).map(TenantId::get),
            "request context ready"
        );
        Ok(RequestContext::new(permissions, scope))
    }

    /// Persist a tenant switch and apply it to this request's scope.
    pub fn switch_tenant(
        &self,
        ctx: &mut RequestContext,
        kind: TenantKind,
        tenant_id: TenantId,
    ) -> Result<TenantState, AccessError> {
        Ok(self.resolver.switch_in_scope(ctx.scope_mut(), kind, tenant_id)?)
    }

    /// Run a listing scoped to the request's tenant for the entity's axis.
    pub fn list<D>(
        &self,
        ctx: &RequestContext,
        source: &D,
        spec: &AllowedSpec,
        query: &QuerySpec,
    ) -> Result<PagedResult<D::Row>, AccessError>
    where
        D: DataSource + ?Sized,
    {
        let tenant_id = spec.tenant().and_then(|binding| ctx.tenant(binding.kind));
        Ok(self.engine.execute(source, spec, query, tenant_id)?)
    }

    /// [`Self::list`] behind an all-of permission check.
    pub fn list_authorized<D>(
        &self,
        ctx: &RequestContext,
        required: &[&str],
        source: &D,
        spec: &AllowedSpec,
        query: &QuerySpec,
    ) -> Result<PagedResult<D::Row>, AccessError>
    where
        D: DataSource + ?Sized,
    {
        ctx.require_all(required)?;
        self.list(ctx, source, spec, query)
    }
}
