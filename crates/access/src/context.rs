use stockwise_auth::{AggregationResult, AuthorizationGate, AuthzError, PermissionMatrix, RequiresPermissions};
use stockwise_core::{TenantId, TenantKind, UserId};
use stockwise_tenancy::RequestScope;

/// Everything resolved once at the start of a request: the user's aggregated
/// permissions and the snapshot of their tenant context.
///
/// Only [`crate::AccessPipeline::begin`] creates one, so the tenant context
/// is ensured exactly once per request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    permissions: AggregationResult,
    scope: RequestScope,
}

impl RequestContext {
    pub(crate) fn new(permissions: AggregationResult, scope: RequestScope) -> Self {
        Self { permissions, scope }
    }

    pub fn user_id(&self) -> UserId {
        self.scope.user_id()
    }

    /// Aggregated permissions, for permission-aware presentation.
    pub fn permissions(&self) -> &AggregationResult {
        &self.permissions
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.permissions.matrix
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    pub(crate) fn scope_mut(&mut self) -> &mut RequestScope {
        &mut self.scope
    }

    pub fn tenant(&self, kind: TenantKind) -> Option<TenantId> {
        self.scope.tenant(kind)
    }

    pub fn gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(&self.permissions.matrix)
    }

    pub fn require(&self, permission: &str) -> Result<(), AuthzError> {
        self.gate().require(permission)
    }

    pub fn require_all<S: AsRef<str>>(&self, permissions: &[S]) -> Result<(), AuthzError> {
        self.gate().require_all(permissions)
    }

    pub fn require_any<S: AsRef<str>>(&self, permissions: &[S]) -> Result<(), AuthzError> {
        self.gate().require_any(permissions)
    }

    /// Check an action's declared requirements before dispatching it.
    pub fn authorize_action<A>(&self, action: &A) -> Result<(), AuthzError>
    where
        A: RequiresPermissions + ?Sized,
    {
        self.gate().authorize_action(action)
    }
}
