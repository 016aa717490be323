//! Filter predicate tree handed to the data source.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// Separator between a relation name and its column (`brand.name`).
pub const RELATION_DELIMITER: char = '.';

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches everything.
    Always,
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Case-insensitive substring match.
    Contains { column: String, needle: String },
    /// Sub-query: some related record satisfies `predicate`.
    Related {
        relation: String,
        predicate: Box<Predicate>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Apply `build` to the column of `path`, wrapping it in a [`Predicate::Related`]
    /// for every relation segment (`a.b.col` → related `a` → related `b` → `col`).
    pub fn on_path<F>(path: &str, build: F) -> Predicate
    where
        F: FnOnce(String) -> Predicate,
    {
        match path.split_once(RELATION_DELIMITER) {
            Some((relation, rest)) if !relation.is_empty() && !rest.is_empty() => {
                Predicate::Related {
                    relation: relation.to_string(),
                    predicate: Box::new(Predicate::on_path(rest, build)),
                }
            }
            _ => build(path.to_string()),
        }
    }

    /// Combine with AND, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::Always => {}
                Predicate::And(inner) => parts.extend(inner),
                p => parts.push(p),
            }
        }
        match parts.len() {
            0 => Predicate::Always,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    /// Evaluate against a JSON record. Related records are nested objects
    /// (to-one) or arrays of objects (to-many) under the relation key.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Eq { column, value } => row.get(column).is_some_and(|v| loose_eq(v, value)),
            Predicate::In { column, values } => row
                .get(column)
                .is_some_and(|v| values.iter().any(|candidate| loose_eq(v, candidate))),
            Predicate::Contains { column, needle } => row
                .get(column)
                .and_then(searchable_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::Related { relation, predicate } => match row.get(relation) {
                Some(Value::Array(items)) => items.iter().any(|item| predicate.matches(item)),
                Some(related @ Value::Object(_)) => predicate.matches(related),
                _ => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(row)),
        }
    }
}

/// Equality with the coercions a SQL store applies to query-string input:
/// `"5"` equals `5`, `"1"`/`"true"` equal `true`.
pub fn loose_eq(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (stored, wanted) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (n.as_f64(), s.trim().parse::<f64>()) {
                (Some(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            matches!((b, s.as_str()), (true, "1" | "true") | (false, "0" | "false"))
        }
        _ => false,
    }
}

fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Total order used for sorting records: missing/null first, then booleans,
/// numbers, strings (case-insensitive, ties broken by raw order).
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Look up a dotted path through nested objects.
pub fn lookup<'v>(row: &'v Value, path: &str) -> Option<&'v Value> {
    path.split(RELATION_DELIMITER)
        .try_fold(row, |current, segment| current.get(segment))
}
