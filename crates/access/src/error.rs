use thiserror::Error;

use stockwise_auth::AuthzError;
use stockwise_core::{SourceError, TenantId, TenantKind, UserId};
use stockwise_tenancy::TenancyError;

/// Everything a request can fail with at the access layer.
///
/// Authorization fails fast, optional query input never fails, and
/// collaborator errors pass through unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error("user {user_id} cannot access {kind} {tenant_id}")]
    InvalidTenant {
        user_id: UserId,
        kind: TenantKind,
        tenant_id: TenantId,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl From<TenancyError> for AccessError {
    fn from(value: TenancyError) -> Self {
        match value {
            TenancyError::InvalidTenant {
                user_id,
                kind,
                tenant_id,
            } => AccessError::InvalidTenant {
                user_id,
                kind,
                tenant_id,
            },
            TenancyError::Source(err) => AccessError::Source(err),
        }
    }
}

impl AccessError {
    /// HTTP-equivalent status class for the boundary layer.
    pub fn status_hint(&self) -> u16 {
        match self {
            AccessError::Denied(_) => 403,
            AccessError::InvalidTenant { .. } => 422,
            AccessError::Source(SourceError::Unavailable(_)) => 503,
            AccessError::Source(SourceError::Storage(_)) => 500,
        }
    }

    /// Authorization and tenant errors are final. Source errors are left to
    /// the collaborator's own retry policy; nothing here retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Source(SourceError::Unavailable(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenancy_errors_are_flattened() {
        let source: AccessError = TenancyError::Source(SourceError::unavailable("down")).into();
        assert_eq!(source, AccessError::Source(SourceError::unavailable("down")));
        assert_eq!(source.status_hint(), 503);
        assert!(source.is_retryable());

        let invalid: AccessError = TenancyError::InvalidTenant {
            user_id: UserId::new(1),
            kind: TenantKind::Store,
            tenant_id: TenantId::new(2),
        }
        .into();
        assert_eq!(invalid.status_hint(), 422);
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn denial_maps_to_forbidden() {
        let err: AccessError = AuthzError::PermissionDenied {
            required: vec!["brand_view".into()],
        }
        .into();
        assert_eq!(err.status_hint(), 403);
        assert_eq!(err.to_string(), "permission denied: requires brand_view");
    }
}
