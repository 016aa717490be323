//! Validation, tenant injection and execution of listing queries.
//!
//! Optional query input degrades gracefully: anything the entity does not
//! allow is dropped (and reported in [`DroppedInput`]), never an error. The
//! only failure surfaced by [`ScopedQueryEngine::execute`] is the data
//! source's own.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use stockwise_core::{SourceResult, TenantId};

use crate::spec::{AllowedFilter, FilterMode};
use crate::{AllowedSpec, DataSource, PagedResult, Predicate, QuerySpec, SortKey};

/// Reserved filter key expanding into an OR search over the entity's
/// searchable fields.
pub const GLOBAL_SEARCH_KEY: &str = "global";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_per_page: u64,
    /// Upper bound for caller-supplied page sizes; `None` leaves them uncapped.
    pub max_per_page: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: None,
        }
    }
}

impl PaginationConfig {
    /// Non-positive or missing values fall back to the defaults.
    pub fn clamp(&self, page: Option<i64>, per_page: Option<i64>) -> (u64, u64) {
        let page = page
            .filter(|p| *p >= 1)
            .map_or(DEFAULT_PAGE, |p| p as u64);
        let default_per_page = self.default_per_page.max(1);
        let mut per_page = per_page
            .filter(|p| *p >= 1)
            .map_or(default_per_page, |p| p as u64);
        if let Some(max) = self.max_per_page {
            per_page = per_page.min(max.max(1));
        }
        (page, per_page)
    }
}

/// Keys removed during validation. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DroppedInput {
    pub filters: Vec<String>,
    pub sorts: Vec<String>,
    pub includes: Vec<String>,
    pub fields: Vec<String>,
}

impl DroppedInput {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.sorts.is_empty()
            && self.includes.is_empty()
            && self.fields.is_empty()
    }
}

/// A [`QuerySpec`] reduced to what the entity allows.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub filters: Vec<(AllowedFilter, Value)>,
    pub global_search: Option<String>,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub per_page: u64,
    pub includes: Vec<String>,
    pub fields: Vec<String>,
    pub dropped: DroppedInput,
}

/// What the engine asks the data source for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub entity: String,
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub per_page: u64,
    pub includes: Vec<String>,
    pub fields: Vec<String>,
}

/// Stateless; safe to share across threads and requests.
#[derive(Debug, Clone, Default)]
pub struct ScopedQueryEngine {
    pagination: PaginationConfig,
}

impl ScopedQueryEngine {
    pub fn new(pagination: PaginationConfig) -> Self {
        Self { pagination }
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    pub fn validate(&self, spec: &AllowedSpec, query: &QuerySpec) -> ValidatedQuery {
        let mut dropped = DroppedInput::default();
        let tenant_column = spec.tenant().map(|t| t.column.as_str());

        let mut filters = Vec::new();
        let mut global_search = None;
        for (key, value) in &query.filters {
            if key == GLOBAL_SEARCH_KEY {
                global_search = search_text(value);
                continue;
            }
            let allowed = spec
                .allowed_filter(key)
                .filter(|f| Some(f.target()) != tenant_column && Some(key.as_str()) != tenant_column);
            match allowed {
                Some(filter) => {
                    if !is_blank(value) {
                        filters.push((filter.clone(), value.clone()));
                    }
                }
                None => dropped.filters.push(key.clone()),
            }
        }

        let mut sort: Vec<SortKey> = Vec::new();
        for key in &query.sort {
            if !spec.allows_sort(&key.field) {
                dropped.sorts.push(key.field.clone());
            } else if !sort.iter().any(|k| k.field == key.field) {
                sort.push(key.clone());
            }
        }
        if sort.is_empty() && !spec.default_sort().is_empty() {
            sort.push(SortKey::asc(spec.default_sort()));
        }

        let includes = keep_allowed(&query.includes, |i| spec.allows_include(i), &mut dropped.includes);
        let fields = keep_allowed(&query.fields, |f| spec.allows_field(f), &mut dropped.fields);

        let (page, per_page) = self.pagination.clamp(query.page, query.per_page);

        ValidatedQuery {
            filters,
            global_search,
            sort,
            page,
            per_page,
            includes,
            fields,
            dropped,
        }
    }

    /// Build the fetch request, or `None` when the entity is tenant-scoped
    /// and no tenant is available (the listing is empty rather than unscoped).
    pub fn build(
        &self,
        spec: &AllowedSpec,
        query: &QuerySpec,
        tenant_id: Option<TenantId>,
    ) -> Option<FetchRequest> {
        let validated = self.validate(spec, query);
        if !validated.dropped.is_empty() {
            warn!(entity = spec.entity(), dropped = ?validated.dropped, "ignored query input");
        }
        self.build_validated(spec, validated, tenant_id)
    }

    fn build_validated(
        &self,
        spec: &AllowedSpec,
        validated: ValidatedQuery,
        tenant_id: Option<TenantId>,
    ) -> Option<FetchRequest> {
        let mut predicate = Predicate::Always;
        for (filter, value) in &validated.filters {
            predicate = predicate.and(filter_predicate(filter, value));
        }

        if let Some(needle) = &validated.global_search {
            if !spec.searchable_fields().is_empty() {
                let alternatives = spec
                    .searchable_fields()
                    .iter()
                    .map(|field| {
                        Predicate::on_path(field, |column| Predicate::Contains {
                            column,
                            needle: needle.clone(),
                        })
                    })
                    .collect();
                predicate = predicate.and(Predicate::Or(alternatives));
            }
        }

        // Tenant predicate goes last and is built only from the binding.
        match (spec.tenant(), tenant_id) {
            (Some(binding), Some(tenant_id)) => {
                predicate = predicate.and(Predicate::Eq {
                    column: binding.column.clone(),
                    value: Value::from(tenant_id.get()),
                });
            }
            (Some(binding), None) => {
                debug!(entity = spec.entity(), kind = %binding.kind, "no tenant in scope; empty listing");
                return None;
            }
            (None, _) => {}
        }

        Some(FetchRequest {
            entity: spec.entity().to_string(),
            predicate,
            sort: validated.sort,
            page: validated.page,
            per_page: validated.per_page,
            includes: validated.includes,
            fields: validated.fields,
        })
    }

    /// Validate, scope and run a listing query.
    pub fn execute<D>(
        &self,
        source: &D,
        spec: &AllowedSpec,
        query: &QuerySpec,
        tenant_id: Option<TenantId>,
    ) -> SourceResult<PagedResult<D::Row>>
    where
        D: DataSource + ?Sized,
    {
        let validated = self.validate(spec, query);
        if !validated.dropped.is_empty() {
            warn!(entity = spec.entity(), dropped = ?validated.dropped, "ignored query input");
        }
        let (page, per_page) = (validated.page, validated.per_page);

        let Some(request) = self.build_validated(spec, validated, tenant_id) else {
            return Ok(PagedResult::empty(page, per_page));
        };

        let result = source.fetch(&request)?;
        debug!(entity = spec.entity(), total = result.total, page, per_page, "listing executed");
        Ok(PagedResult::new(result.rows, page, per_page, result.total))
    }
}

fn keep_allowed<F>(requested: &[String], allowed: F, dropped: &mut Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut kept: Vec<String> = Vec::new();
    for item in requested {
        if !allowed(item.as_str()) {
            dropped.push(item.clone());
        } else if !kept.contains(item) {
            kept.push(item.clone());
        }
    }
    kept
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn search_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn filter_predicate(filter: &AllowedFilter, value: &Value) -> Predicate {
    let values: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) if filter.mode == FilterMode::Exact && s.contains(',') => s
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Value::String(v.to_string()))
            .collect(),
        other => vec![other.clone()],
    };

    Predicate::on_path(filter.target(), |column| match filter.mode {
        FilterMode::Exact if values.len() == 1 => Predicate::Eq {
            column,
            value: values[0].clone(),
        },
        FilterMode::Exact => Predicate::In { column, values },
        FilterMode::Partial => {
            let mut alternatives: Vec<Predicate> = values
                .iter()
                .filter_map(search_text)
                .map(|needle| Predicate::Contains {
                    column: column.clone(),
                    needle,
                })
                .collect();
            match alternatives.len() {
                0 => Predicate::Always,
                1 => alternatives.remove(0),
                _ => Predicate::Or(alternatives),
            }
        }
    })
}
