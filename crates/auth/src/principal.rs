use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use stockwise_core::{SourceError, SourceResult, UserId};

use crate::{Permission, Role};

/// A user's authorization data as delivered by the permission source:
/// assigned roles (already resolved to their permissions) plus direct grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub direct_permissions: Vec<Permission>,
}

impl UserPermissions {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            roles: Vec::new(),
            direct_permissions: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.direct_permissions.push(permission);
        self
    }
}

/// Authoritative role/permission lookup (external collaborator).
///
/// Queried once per request; implementations must not serve stale data
/// after role edits.
pub trait PermissionSource: Send + Sync {
    fn load(&self, user_id: UserId) -> SourceResult<UserPermissions>;
}

impl<S> PermissionSource for Arc<S>
where
    S: PermissionSource + ?Sized,
{
    fn load(&self, user_id: UserId) -> SourceResult<UserPermissions> {
        (**self).load(user_id)
    }
}

/// In-memory permission source for tests/dev.
///
/// Unknown users resolve to an empty grant set.
#[derive(Debug, Default)]
pub struct InMemoryPermissionSource {
    users: RwLock<HashMap<UserId, UserPermissions>>,
}

impl InMemoryPermissionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, permissions: UserPermissions) -> SourceResult<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| SourceError::poisoned("permission source"))?;
        users.insert(permissions.user_id, permissions);
        Ok(())
    }
}

impl PermissionSource for InMemoryPermissionSource {
    fn load(&self, user_id: UserId) -> SourceResult<UserPermissions> {
        let users = self
            .users
            .read()
            .map_err(|_| SourceError::poisoned("permission source"))?;
        Ok(users
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserPermissions::new(user_id)))
    }
}
