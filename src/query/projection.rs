use std::collections::HashSet;
use serde_json::{Map, Value};
use crate::errors::{AppError, AppResult};

const ID_FIELD: &str = "_id";

/// Field selection applied to serialized documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep only these fields; `_id` rides along unless `with_id` is false.
    Include { fields: HashSet<String>, with_id: bool },
    /// Drop these fields.
    Exclude(HashSet<String>),
}

impl Projection {
    /// Accepts `{"field": 1 | 0 | true | false}` or a space separated string
    /// such as `"name email -_id"`. Returns `None` for an empty selection.
    pub fn parse(value: &Value) -> AppResult<Option<Self>> {
        let entries: Vec<(String, bool)> = match value {
            Value::Null => return Ok(None),
            Value::Object(map) => map
                .iter()
                .map(|(field, flag)| Ok((field.clone(), include_flag(field, flag)?)))
                .collect::<AppResult<_>>()?,
            Value::String(s) => s
                .split_whitespace()
                .map(|token| match token.strip_prefix('-') {
                    Some(field) => (field.to_string(), false),
                    None => (token.trim_start_matches('+').to_string(), true),
                })
                .collect(),
            _ => return Err(AppError::validation("Invalid select: expected a JSON object")),
        };

        let mut id_flag: Option<bool> = None;
        let mut included = HashSet::new();
        let mut excluded = HashSet::new();
        for (field, include) in entries {
            if field == ID_FIELD {
                id_flag = Some(include);
            } else if include {
                included.insert(field);
            } else {
                excluded.insert(field);
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(AppError::validation(
                "Invalid select: cannot mix inclusion and exclusion",
            ));
        }

        // `{"_id": 1}` on its own selects just the id.
        if !included.is_empty() || id_flag == Some(true) {
            return Ok(Some(Projection::Include {
                fields: included,
                with_id: id_flag != Some(false),
            }));
        }
        if id_flag == Some(false) {
            excluded.insert(ID_FIELD.to_string());
        }
        if excluded.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Projection::Exclude(excluded)))
        }
    }

    pub fn apply(&self, doc: Value) -> Value {
        let Value::Object(map) = doc else {
            return doc;
        };
        let kept: Map<String, Value> = map
            .into_iter()
            .filter(|(key, _)| self.keeps(key))
            .collect();
        Value::Object(kept)
    }

    fn keeps(&self, key: &str) -> bool {
        match self {
            Projection::Include { fields, with_id } => {
                fields.contains(key) || (key == ID_FIELD && *with_id)
            }
            Projection::Exclude(fields) => !fields.contains(key),
        }
    }
}

fn include_flag(field: &str, flag: &Value) -> AppResult<bool> {
    match flag {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |f| f != 0.0)),
        _ => Err(AppError::validation(format!(
            "Invalid select value for '{}'",
            field
        ))),
    }
}
