//! `stockwise-query` — declarative, tenant-safe listing queries.
//!
//! Callers describe filters/sorts/includes/fields/pagination in a
//! [`QuerySpec`]; each entity declares what callers may use in an
//! [`AllowedSpec`]. The [`ScopedQueryEngine`] reconciles the two, injects
//! the tenant predicate and hands a [`FetchRequest`] to a [`DataSource`].

pub mod engine;
pub mod page;
pub mod predicate;
pub mod source;
pub mod spec;

pub use engine::{
    DroppedInput, FetchRequest, GLOBAL_SEARCH_KEY, PaginationConfig, ScopedQueryEngine,
    ValidatedQuery,
};
pub use page::{PageMeta, PagedResult};
pub use predicate::Predicate;
pub use source::{DataSource, FetchResult, InMemoryDataSource};
pub use spec::{
    AllowedFilter, AllowedSpec, FilterMode, QuerySpec, SortDirection, SortKey, TenantBinding,
};
