//! Paged data fetch collaborator and an in-memory reference implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use stockwise_core::{SourceError, SourceResult};

use crate::engine::FetchRequest;
use crate::predicate::{compare_values, lookup};
use crate::SortDirection;

/// Rows of one page plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<R> {
    pub rows: Vec<R>,
    pub total: u64,
}

/// Generic paged fetch: `fetch(entity, predicate, sort, page, per_page)`.
///
/// Failures are returned as-is to the engine's caller; retry policy belongs
/// to the implementation.
pub trait DataSource: Send + Sync {
    type Row;

    fn fetch(&self, request: &FetchRequest) -> SourceResult<FetchResult<Self::Row>>;
}

impl<D> DataSource for Arc<D>
where
    D: DataSource + ?Sized,
{
    type Row = D::Row;

    fn fetch(&self, request: &FetchRequest) -> SourceResult<FetchResult<Self::Row>> {
        (**self).fetch(request)
    }
}

/// In-memory data source over JSON records, for tests/dev.
///
/// Relations are nested under their name as an object (to-one) or an array
/// of objects (to-many) and are only returned when included.
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: &str, row: Value) -> SourceResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| SourceError::poisoned("in-memory table"))?;
        tables.entry(entity.to_string()).or_default().push(row);
        Ok(())
    }

    pub fn with_rows<I>(self, entity: &str, rows: I) -> SourceResult<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        for row in rows {
            self.insert(entity, row)?;
        }
        Ok(self)
    }
}

impl DataSource for InMemoryDataSource {
    type Row = Value;

    fn fetch(&self, request: &FetchRequest) -> SourceResult<FetchResult<Value>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| SourceError::poisoned("in-memory table"))?;
        let Some(rows) = tables.get(&request.entity) else {
            return Ok(FetchResult {
                rows: Vec::new(),
                total: 0,
            });
        };

        let mut matching: Vec<&Value> = rows.iter().filter(|r| request.predicate.matches(r)).collect();
        matching.sort_by(|a, b| {
            request
                .sort
                .iter()
                .map(|key| {
                    let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
                    match key.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = matching.len() as u64;
        let offset = request.page.saturating_sub(1).saturating_mul(request.per_page);
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(request.per_page).unwrap_or(usize::MAX))
            .map(|row| project(row, &request.fields, &request.includes))
            .collect();

        Ok(FetchResult { rows: page, total })
    }
}

fn is_relation(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.first().is_some_and(Value::is_object),
        _ => false,
    }
}

fn project(row: &Value, fields: &[String], includes: &[String]) -> Value {
    let Value::Object(columns) = row else {
        return row.clone();
    };
    let out: Map<String, Value> = columns
        .iter()
        .filter(|(key, value)| {
            if includes.iter().any(|i| i == *key) {
                return true;
            }
            if is_relation(value) {
                return false;
            }
            fields.is_empty() || fields.iter().any(|f| f == *key)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(out)
}
