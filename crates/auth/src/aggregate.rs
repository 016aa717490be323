//! Effective-permission aggregation.
//!
//! Turns a user's direct permissions and assigned roles into the structure
//! presentation layers render from and the gate decides on.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use stockwise_core::UserId;

use crate::permissions::{DEFAULT_GUARD, GENERAL_MODULE};
use crate::{Permission, PermissionMatrix, RankedRole, RoleHierarchy, UserPermissions};

/// Permissions belonging to one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleGroup {
    pub permissions: Vec<String>,
    pub actions: Vec<String>,
    pub count: usize,
}

/// Totals for UI display. Nothing downstream depends on these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionCounts {
    pub total: usize,
    pub direct: usize,
    pub via_roles: usize,
    pub roles: usize,
    pub modules: usize,
    pub wildcards: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub user_id: UserId,
    /// Deduplicated by name; direct grants first, then role grants in role order.
    pub effective_permissions: Vec<Permission>,
    pub module_groups: BTreeMap<String, ModuleGroup>,
    pub matrix: PermissionMatrix,
    pub roles: Vec<String>,
    pub highest_role: Option<RankedRole>,
    pub counts: PermissionCounts,
}

impl AggregationResult {
    pub fn permission_names(&self) -> Vec<&str> {
        self.effective_permissions.iter().map(Permission::as_str).collect()
    }
}

/// Builds [`AggregationResult`]s for a single guard.
#[derive(Debug, Clone)]
pub struct PermissionAggregator {
    hierarchy: RoleHierarchy,
    guard: String,
}

impl Default for PermissionAggregator {
    fn default() -> Self {
        Self::new(RoleHierarchy::default())
    }
}

impl PermissionAggregator {
    pub fn new(hierarchy: RoleHierarchy) -> Self {
        Self {
            hierarchy,
            guard: DEFAULT_GUARD.to_string(),
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    pub fn guard(&self) -> &str {
        &self.guard
    }

    /// Aggregate a user's grants. Pure: same input, same output.
    ///
    /// Roles and permissions registered under another guard are ignored.
    pub fn aggregate(&self, user: &UserPermissions) -> AggregationResult {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut effective: Vec<Permission> = Vec::new();

        for permission in &user.direct_permissions {
            if self.in_guard(&permission.guard, &permission.name) && seen.insert(permission.name.as_str()) {
                effective.push(permission.clone());
            }
        }
        let direct = effective.len();

        let mut role_names: Vec<String> = Vec::new();
        for role in &user.roles {
            if !self.in_guard(&role.guard, &role.name) || role_names.contains(&role.name) {
                continue;
            }
            role_names.push(role.name.clone());
            for permission in &role.permissions {
                if self.in_guard(&permission.guard, &permission.name) && seen.insert(permission.name.as_str())
                {
                    effective.push(permission.clone());
                }
            }
        }

        let module_groups = group_by_module(&effective);
        let matrix = PermissionMatrix::from_permissions(&effective);
        let highest_role = self.hierarchy.highest(role_names.iter().map(String::as_str));

        let counts = PermissionCounts {
            total: effective.len(),
            direct,
            via_roles: effective.len() - direct,
            roles: role_names.len(),
            modules: module_groups.len(),
            wildcards: matrix.wildcards().count(),
        };

        debug!(
            user_id = %user.user_id,
            permissions = counts.total,
            roles = counts.roles,
            highest_role = highest_role.as_ref().map(|r| r.name.as_str()).unwrap_or("-"),
            "aggregated permissions"
        );

        AggregationResult {
            user_id: user.user_id,
            effective_permissions: effective,
            module_groups,
            matrix,
            roles: role_names,
            highest_role,
            counts,
        }
    }

    fn in_guard(&self, guard: &str, name: &str) -> bool {
        if guard == self.guard {
            return true;
        }
        debug!(name, guard, expected = %self.guard, "skipping grant from foreign guard");
        false
    }
}

fn group_by_module(permissions: &[Permission]) -> BTreeMap<String, ModuleGroup> {
    let mut groups: BTreeMap<String, ModuleGroup> = BTreeMap::new();
    for permission in permissions {
        let module = permission.effective_module().unwrap_or(GENERAL_MODULE);
        let group = groups.entry(module.to_string()).or_default();
        group.permissions.push(permission.name.clone());
        group.count += 1;

        let action = permission.action();
        if !action.is_empty() && !group.actions.iter().any(|a| a == action) {
            group.actions.push(action.to_string());
        }
    }
    groups
}
