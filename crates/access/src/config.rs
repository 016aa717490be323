//! Environment-driven configuration.

use anyhow::Context;

use stockwise_auth::permissions::DEFAULT_GUARD;
use stockwise_auth::{PermissionAggregator, RoleHierarchy};
use stockwise_query::{PaginationConfig, ScopedQueryEngine};

pub const ENV_GUARD: &str = "STOCKWISE_GUARD";
pub const ENV_ROLE_RANKS: &str = "STOCKWISE_ROLE_RANKS";
pub const ENV_DEFAULT_PER_PAGE: &str = "STOCKWISE_DEFAULT_PER_PAGE";
pub const ENV_MAX_PER_PAGE: &str = "STOCKWISE_MAX_PER_PAGE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Guard permissions and roles must belong to.
    pub guard: String,
    pub role_hierarchy: RoleHierarchy,
    pub pagination: PaginationConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            guard: DEFAULT_GUARD.to_string(),
            role_hierarchy: RoleHierarchy::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Read configuration from the process environment; unset variables keep
    /// their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (used by tests instead of the
    /// process environment).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(guard) = var(ENV_GUARD) {
            config.guard = guard.trim().to_string();
        }
        if let Some(ranks) = var(ENV_ROLE_RANKS) {
            config.role_hierarchy = RoleHierarchy::parse(&ranks)
                .with_context(|| format!("invalid {ENV_ROLE_RANKS}"))?;
        }
        if let Some(per_page) = var(ENV_DEFAULT_PER_PAGE) {
            config.pagination.default_per_page = parse_page_size(ENV_DEFAULT_PER_PAGE, &per_page)?;
        }
        if let Some(max) = var(ENV_MAX_PER_PAGE) {
            config.pagination.max_per_page = Some(parse_page_size(ENV_MAX_PER_PAGE, &max)?);
        }
        Ok(config)
    }

    pub fn aggregator(&self) -> PermissionAggregator {
        PermissionAggregator::new(self.role_hierarchy.clone()).with_guard(self.guard.clone())
    }

    pub fn engine(&self) -> ScopedQueryEngine {
        ScopedQueryEngine::new(self.pagination)
    }
}

fn parse_page_size(key: &str, raw: &str) -> anyhow::Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    anyhow::ensure!(value > 0, "{key} must be greater than zero");
    Ok(value)
}
