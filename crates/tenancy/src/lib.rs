//! `stockwise-tenancy` — per-user current store/warehouse context.
//!
//! The current tenant is never ambient: it is resolved once per request into
//! a [`RequestScope`] and passed explicitly to every tenant-scoped call.

pub mod context;
pub mod resolver;
pub mod store;

pub use context::{RequestScope, TenantContext, TenantState};
pub use resolver::{TenancyError, TenantContextResolver};
pub use store::{ActiveTenants, InMemoryActiveTenants, InMemoryTenantContextStore, TenantContextStore};
