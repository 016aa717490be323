//! Query input ([`QuerySpec`]) and per-entity allow-lists ([`AllowedSpec`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use stockwise_core::TenantKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse a signed token: `"-name"` → desc, `"name"` / `"+name"` → asc.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (direction, field) = match *token.as_bytes().first()? {
            b'-' => (SortDirection::Desc, &token[1..]),
            b'+' => (SortDirection::Asc, &token[1..]),
            _ => (SortDirection::Asc, token),
        };
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// What a caller asks for. Every part is optional and untrusted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub filters: BTreeMap<String, Value>,
    pub sort: Vec<SortKey>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub includes: Vec<String>,
    pub fields: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(relation.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Build from decoded query-string pairs:
    /// `filter[name]=box`, `sort=-created_at,name`, `page=2`, `per_page=50`,
    /// `include=brand,category`, `fields=id,name` (or `fields[products]=...`).
    ///
    /// Unknown keys are ignored; unparsable numbers leave the default in place.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref().trim(), value.as_ref());
            if let Some(name) = bracketed(key, "filter") {
                spec.filters
                    .insert(name.to_string(), Value::String(value.to_string()));
                continue;
            }
            match key {
                "sort" => spec.sort.extend(value.split(',').filter_map(SortKey::parse)),
                "page" => spec.page = value.trim().parse().ok(),
                "per_page" | "perPage" => spec.per_page = value.trim().parse().ok(),
                "include" => spec.includes.extend(split_list(value)),
                k if k == "fields" || bracketed(k, "fields").is_some() => {
                    spec.fields.extend(split_list(value))
                }
                _ => {}
            }
        }
        spec
    }
}

fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|inner| !inner.is_empty())
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// How an allowed filter compares its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Equality; arrays and comma lists become a membership test.
    Exact,
    /// Case-insensitive substring.
    Partial,
}

/// A filter key callers may use, and how it is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedFilter {
    pub name: String,
    pub mode: FilterMode,
    /// Internal column (or `relation.column`) when it differs from `name`.
    pub column: Option<String>,
}

impl AllowedFilter {
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FilterMode::Exact,
            column: None,
        }
    }

    pub fn partial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FilterMode::Partial,
            column: None,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn target(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Column an entity is partitioned by, and the tenant axis it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantBinding {
    pub column: String,
    pub kind: TenantKind,
}

/// Per-entity allow-list.
///
/// The tenant column is never accepted as a filter or sort: declaring one is
/// dropped (with a warning) whichever order the builder methods are called in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedSpec {
    entity: String,
    filters: Vec<AllowedFilter>,
    sorts: BTreeSet<String>,
    includes: BTreeSet<String>,
    fields: BTreeSet<String>,
    default_sort: String,
    searchable: Vec<String>,
    tenant: Option<TenantBinding>,
}

impl AllowedSpec {
    pub fn new(entity: impl Into<String>, default_sort: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filters: Vec::new(),
            sorts: BTreeSet::new(),
            includes: BTreeSet::new(),
            fields: BTreeSet::new(),
            default_sort: default_sort.into(),
            searchable: Vec::new(),
            tenant: None,
        }
    }

    pub fn filter(mut self, filter: AllowedFilter) -> Self {
        if self.targets_tenant_column(&filter) {
            warn!(entity = %self.entity, filter = %filter.name, "tenant column cannot be an allowed filter");
            return self;
        }
        self.filters.retain(|f| f.name != filter.name);
        self.filters.push(filter);
        self
    }

    pub fn sorts<I, S>(mut self, sorts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for sort in sorts.into_iter().map(Into::into) {
            if self.tenant.as_ref().is_some_and(|t| t.column == sort) {
                warn!(entity = %self.entity, sort = %sort, "tenant column cannot be an allowed sort");
                continue;
            }
            self.sorts.insert(sort);
        }
        self
    }

    pub fn includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(includes.into_iter().map(Into::into));
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Fields covered by the reserved `global` search filter. A
    /// `relation.column` entry searches the related entity.
    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn tenant_scoped(mut self, column: impl Into<String>, kind: TenantKind) -> Self {
        let column = column.into();
        let entity = self.entity.clone();
        self.filters.retain(|f| {
            let keep = f.name != column && f.target() != column;
            if !keep {
                warn!(entity = %entity, filter = %f.name, "tenant column cannot be an allowed filter");
            }
            keep
        });
        if self.sorts.remove(&column) {
            warn!(entity = %entity, sort = %column, "tenant column cannot be an allowed sort");
        }
        self.tenant = Some(TenantBinding { column, kind });
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn allowed_filter(&self, name: &str) -> Option<&AllowedFilter> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn allows_sort(&self, field: &str) -> bool {
        self.sorts.contains(field)
    }

    pub fn allows_include(&self, relation: &str) -> bool {
        self.includes.contains(relation)
    }

    pub fn allows_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn default_sort(&self) -> &str {
        &self.default_sort
    }

    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable
    }

    pub fn tenant(&self) -> Option<&TenantBinding> {
        self.tenant.as_ref()
    }

    fn targets_tenant_column(&self, filter: &AllowedFilter) -> bool {
        self.tenant
            .as_ref()
            .is_some_and(|t| filter.name == t.column || filter.target() == t.column)
    }
}
