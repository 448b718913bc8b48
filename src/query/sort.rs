use std::cmp::Ordering;
use serde_json::Value;
use crate::errors::{AppError, AppResult};
use super::filter::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordered list of sort keys, applied left to right. Keys may be dotted
/// paths into nested objects.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    keys: Vec<(Vec<String>, Direction)>,
}

impl SortSpec {
    pub fn parse(value: &Value) -> AppResult<Self> {
        let Value::Object(map) = value else {
            return Err(AppError::validation("Invalid sort: expected a JSON object"));
        };

        let mut keys = Vec::with_capacity(map.len());
        for (field, direction) in map {
            let path = field.split('.').map(str::to_string).collect();
            keys.push((path, direction_of(field, direction)?));
        }
        Ok(Self { keys })
    }

    pub fn apply(&self, docs: &mut [Value]) {
        if self.keys.is_empty() {
            return;
        }
        docs.sort_by(|a, b| {
            for (path, direction) in &self.keys {
                let ordering = order(resolve(a, path), resolve(b, path));
                let ordering = match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

fn direction_of(field: &str, value: &Value) -> AppResult<Direction> {
    let direction = match value {
        Value::Number(n) if n.as_f64() == Some(1.0) => Some(Direction::Ascending),
        Value::Number(n) if n.as_f64() == Some(-1.0) => Some(Direction::Descending),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "asc" | "ascending" => Some(Direction::Ascending),
            "-1" | "desc" | "descending" => Some(Direction::Descending),
            _ => None,
        },
        _ => None,
    };
    direction.ok_or_else(|| AppError::validation(format!("Invalid sort value for '{}'", field)))
}

// Missing and null first, then numbers, strings, objects, arrays, booleans.
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

// Total order over documents. Stored timestamps share one fixed-width UTC
// format, so plain string order is chronological.
fn order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| order(Some(x), Some(y)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_by_keys_in_order() {
        let mut docs = vec![
            json!({"name": "b", "completed": true}),
            json!({"name": "a", "completed": false}),
            json!({"name": "c", "completed": false}),
            json!({"completed": false}),
        ];
        SortSpec::parse(&json!({"completed": 1, "name": -1}))
            .unwrap()
            .apply(&mut docs);

        let names: Vec<Option<&str>> = docs.iter().map(|d| d["name"].as_str()).collect();
        assert_eq!(names, vec![Some("c"), Some("a"), None, Some("b")]);
    }

    #[test]
    fn date_strings_sort_the_same_in_either_input_order() {
        let forward = vec![
            json!({"deadline": "2025-01-01T00:00:00.000Z"}),
            json!({"deadline": "2025-01-01"}),
            json!({"deadline": "2024-06-30T12:00:00.000Z"}),
        ];
        let mut backward: Vec<Value> = forward.iter().rev().cloned().collect();
        let mut forward = forward;
        let spec = SortSpec::parse(&json!({"deadline": 1})).unwrap();
        spec.apply(&mut forward);
        spec.apply(&mut backward);

        assert_eq!(forward, backward);
        assert_eq!(forward[0]["deadline"], "2024-06-30T12:00:00.000Z");
        assert_eq!(forward[2]["deadline"], "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn dotted_keys_reach_nested_fields() {
        let mut docs = vec![
            json!({"owner": {"name": "b"}}),
            json!({"owner": {"name": "c"}}),
            json!({"owner": {"name": "a"}}),
        ];
        SortSpec::parse(&json!({"owner.name": -1}))
            .unwrap()
            .apply(&mut docs);

        let names: Vec<&str> = docs
            .iter()
            .map(|d| d["owner"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn rejects_unknown_direction() {
        assert!(SortSpec::parse(&json!({"name": 2})).is_err());
        assert!(SortSpec::parse(&json!({"name": "up"})).is_err());
        assert!(SortSpec::parse(&json!(["name"])).is_err());
        assert!(SortSpec::parse(&json!({"name": "desc"})).is_ok());
    }
}
