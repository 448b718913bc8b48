//! `where` predicates over JSON documents.
//!
//! A filter is compiled once (so malformed input is rejected up front) and
//! then evaluated against each document's serialized form.

use std::cmp::Ordering;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use crate::errors::{AppError, AppResult};
use crate::models::forms::parse_date;

#[derive(Debug, Clone)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Field { path: Vec<String>, ops: Vec<Op> },
}

#[derive(Debug, Clone)]
pub enum Op {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Regex),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::And(Vec::new())
    }
}

impl Filter {
    pub fn parse(value: &Value) -> AppResult<Self> {
        match value {
            Value::Null => Ok(Filter::default()),
            Value::Object(map) => compile_document(map),
            _ => Err(invalid("'where' must be a JSON object")),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(doc)),
            Filter::Nor(parts) => !parts.iter().any(|f| f.matches(doc)),
            Filter::Field { path, ops } => {
                let found = resolve(doc, path);
                ops.iter().all(|op| op.matches(found))
            }
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("Invalid filter: {}", msg))
}

fn compile_document(map: &Map<String, Value>) -> AppResult<Filter> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let part = match key.as_str() {
            "$and" => Filter::And(compile_list(key, value)?),
            "$or" => Filter::Or(compile_list(key, value)?),
            "$nor" => Filter::Nor(compile_list(key, value)?),
            op if op.starts_with('$') => return Err(invalid(format!("unknown operator '{}'", op))),
            field => Filter::Field {
                path: field.split('.').map(str::to_string).collect(),
                ops: compile_condition(field, value)?,
            },
        };
        parts.push(part);
    }
    Ok(Filter::And(parts))
}

fn compile_list(key: &str, value: &Value) -> AppResult<Vec<Filter>> {
    let Value::Array(items) = value else {
        return Err(invalid(format!("'{}' expects an array", key)));
    };
    if items.is_empty() {
        return Err(invalid(format!("'{}' expects a non-empty array", key)));
    }
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => compile_document(map),
            _ => Err(invalid(format!("'{}' entries must be objects", key))),
        })
        .collect()
}

fn compile_condition(field: &str, value: &Value) -> AppResult<Vec<Op>> {
    let Value::Object(map) = value else {
        return Ok(vec![Op::Eq(value.clone())]);
    };

    let operator_keys = map.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(vec![Op::Eq(value.clone())]);
    }
    if operator_keys != map.len() {
        return Err(invalid(format!(
            "'{}' mixes operators and plain fields",
            field
        )));
    }

    let options = match map.get("$options") {
        None => "",
        Some(Value::String(s)) => s.as_str(),
        Some(_) => return Err(invalid("'$options' must be a string")),
    };

    let mut ops = Vec::with_capacity(map.len());
    for (key, arg) in map {
        let op = match key.as_str() {
            "$eq" => Op::Eq(arg.clone()),
            "$ne" => Op::Ne(arg.clone()),
            "$gt" => Op::Gt(arg.clone()),
            "$gte" => Op::Gte(arg.clone()),
            "$lt" => Op::Lt(arg.clone()),
            "$lte" => Op::Lte(arg.clone()),
            "$in" => Op::In(array_arg(key, arg)?),
            "$nin" => Op::Nin(array_arg(key, arg)?),
            "$exists" => Op::Exists(truthy(arg)),
            "$regex" => Op::Regex(regex_arg(arg, options)?),
            "$options" if map.contains_key("$regex") => continue,
            other => return Err(invalid(format!("unknown operator '{}'", other))),
        };
        ops.push(op);
    }
    Ok(ops)
}

fn array_arg(key: &str, arg: &Value) -> AppResult<Vec<Value>> {
    match arg {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(invalid(format!("'{}' expects an array", key))),
    }
}

fn truthy(arg: &Value) -> bool {
    match arg {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn regex_arg(arg: &Value, options: &str) -> AppResult<Regex> {
    let Value::String(pattern) = arg else {
        return Err(invalid("'$regex' must be a string"));
    };
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(invalid(format!("unsupported regex option '{}'", other))),
        };
    }
    builder.build().map_err(invalid)
}

pub(super) fn resolve<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, segment| current.get(segment.as_str()))
}

impl Op {
    fn matches(&self, found: Option<&Value>) -> bool {
        match self {
            Op::Eq(expected) => equals(found, expected),
            Op::Ne(expected) => !equals(found, expected),
            Op::Gt(bound) => compares(found, bound, |o| o == Ordering::Greater),
            Op::Gte(bound) => compares(found, bound, |o| o != Ordering::Less),
            Op::Lt(bound) => compares(found, bound, |o| o == Ordering::Less),
            Op::Lte(bound) => compares(found, bound, |o| o != Ordering::Greater),
            Op::In(options) => options.iter().any(|option| equals(found, option)),
            Op::Nin(options) => !options.iter().any(|option| equals(found, option)),
            Op::Exists(wanted) => found.is_some() == *wanted,
            Op::Regex(re) => match found {
                Some(Value::String(s)) => re.is_match(s),
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| matches!(item, Value::String(s) if re.is_match(s))),
                _ => false,
            },
        }
    }
}

// Equality with array-contains semantics: an array field equals a scalar
// when any element does.
fn equals(found: Option<&Value>, expected: &Value) -> bool {
    match (found, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(Value::Array(items)), expected) if !expected.is_array() => {
            items.iter().any(|item| scalar_equals(item, expected))
        }
        (Some(actual), expected) => scalar_equals(actual, expected),
    }
}

fn scalar_equals(actual: &Value, expected: &Value) -> bool {
    actual == expected || compare(actual, expected) == Some(Ordering::Equal)
}

fn compares(found: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match found {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare(item, bound).is_some_and(&accept)),
        Some(actual) => compare(actual, bound).is_some_and(accept),
        None => false,
    }
}

/// Orders a stored value against a query literal, coercing the literal the
/// way the stored type expects: timestamps accept epoch millis or date
/// strings, booleans accept "true"/"false".
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::String(b)) => match b.as_str() {
            "true" => Some(a.cmp(&true)),
            "false" => Some(a.cmp(&false)),
            _ => None,
        },
        (Value::String(a), Value::Number(b)) => {
            let stored = stored_timestamp(a)?;
            let millis = b.as_f64()?;
            (stored as f64).partial_cmp(&millis)
        }
        (Value::String(a), Value::String(b)) => match (stored_timestamp(a), parse_date(b.trim())) {
            (Some(stored), Some(query)) => Some(stored.cmp(&query.timestamp_millis())),
            _ => Some(a.cmp(b)),
        },
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// Stored timestamps are always RFC 3339; plain strings never coerce.
fn stored_timestamp(raw: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
