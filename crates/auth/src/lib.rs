//! `stockwise-auth` — permission aggregation and authorization decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage: it receives
//! already-resolved roles/permissions and returns decisions.

pub mod aggregate;
pub mod authorize;
pub mod matrix;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use aggregate::{AggregationResult, ModuleGroup, PermissionAggregator, PermissionCounts};
pub use authorize::{AuthorizationExplanation, AuthorizationGate, AuthzError, RequiresPermissions};
pub use matrix::PermissionMatrix;
pub use permissions::{Permission, PermissionParts, parse_permission_name};
pub use principal::{InMemoryPermissionSource, PermissionSource, UserPermissions};
pub use roles::{HierarchyParseError, RankedRole, Role, RoleHierarchy};
