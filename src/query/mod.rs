//! Translates list query parameters (`where`, `sort`, `select`/`filter`,
//! `skip`, `limit`, `count`) into an in-process evaluation over serialized
//! documents.

mod filter;
mod projection;
mod sort;

use std::collections::HashMap;
use serde::Serialize;
use serde_json::Value;
use crate::errors::{AppError, AppResult, StoreError};

pub use filter::Filter;
pub use projection::Projection;
pub use sort::{Direction, SortSpec};

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: SortSpec,
    pub projection: Option<Projection>,
    pub skip: usize,
    pub limit: Option<usize>,
    pub count: bool,
}

impl ListQuery {
    /// Parses raw query parameters. `default_limit` applies when `limit` is
    /// absent; `limit=0` means no limit.
    pub fn from_params(params: &HashMap<String, String>, default_limit: Option<usize>) -> AppResult<Self> {
        let filter = match json_param(params, "where")? {
            Some(value) => Filter::parse(&value)?,
            None => Filter::default(),
        };
        let sort = match json_param(params, "sort")? {
            Some(value) => SortSpec::parse(&value)?,
            None => SortSpec::default(),
        };

        let skip = match params.get("skip") {
            Some(raw) => usize::try_from(integer_param("skip", raw)?)
                .map_err(|_| AppError::validation("Invalid value for 'skip'"))?,
            None => 0,
        };
        let limit = match params.get("limit") {
            Some(raw) => match integer_param("limit", raw)?.unsigned_abs() {
                0 => None,
                n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
            },
            None => default_limit,
        };

        Ok(Self {
            filter,
            sort,
            projection: projection_from_params(params)?,
            skip,
            limit,
            count: params.get("count").map(String::as_str) == Some("true"),
        })
    }

    /// With `count` set, yields the number of matches as a JSON integer and
    /// ignores sort/select/skip/limit. Otherwise yields the matching documents
    /// sorted, projected and paginated.
    pub fn run<T: Serialize>(&self, records: &[T]) -> AppResult<Value> {
        let mut matched = Vec::new();
        for record in records {
            let doc = serde_json::to_value(record).map_err(StoreError::from)?;
            if self.filter.matches(&doc) {
                matched.push(doc);
            }
        }

        if self.count {
            return Ok(Value::from(matched.len()));
        }

        self.sort.apply(&mut matched);
        let page = matched
            .into_iter()
            .map(|doc| match &self.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Value::Array(page))
    }
}

/// `select`, falling back to its legacy alias `filter`.
pub fn projection_from_params(params: &HashMap<String, String>) -> AppResult<Option<Projection>> {
    let value = match json_param(params, "select")? {
        Some(value) => Some(value),
        None => json_param(params, "filter")?,
    };
    match value {
        Some(value) => Projection::parse(&value),
        None => Ok(None),
    }
}

/// Applies an optional projection to a single record.
pub fn project<T: Serialize>(record: &T, projection: Option<&Projection>) -> AppResult<Value> {
    let doc = serde_json::to_value(record).map_err(StoreError::from)?;
    Ok(match projection {
        Some(projection) => projection.apply(doc),
        None => doc,
    })
}

fn json_param(params: &HashMap<String, String>, name: &str) -> AppResult<Option<Value>> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid JSON in '{}'", name))),
    }
}

fn integer_param(name: &str, raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::validation(format!("Invalid value for '{}'", name)))
}
