//! Typed views over loosely-typed request bodies.
//!
//! Bodies arrive as JSON objects or url-encoded forms, so every field is
//! coerced here, before anything is written. `None` always means "not
//! supplied"; patch semantics hang off that distinction.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use crate::errors::{AppError, AppResult};

pub type Payload = Map<String, Value>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub assigned_user: Option<String>,
    pub assigned_user_name: Option<String>,
}

impl TaskForm {
    /// Body of `POST /api/tasks`: `name` and `deadline` are required.
    pub fn for_create(payload: &Payload) -> AppResult<Self> {
        let name = text(payload, "name")?.filter(|n| !n.is_empty());
        if name.is_none() {
            return Err(AppError::required("name"));
        }
        if !is_supplied(payload.get("deadline")) {
            return Err(AppError::required("deadline"));
        }

        let mut form = Self::for_update(payload)?;
        form.name = name;
        Ok(form)
    }

    /// Body of `PUT /api/tasks/:id`: any subset of fields.
    pub fn for_update(payload: &Payload) -> AppResult<Self> {
        let name = text(payload, "name")?;
        if matches!(name.as_deref(), Some("")) {
            return Err(AppError::required("name"));
        }

        let deadline = match payload.get("deadline") {
            Some(value) if is_supplied(Some(value)) => Some(
                parse_deadline(value)
                    .ok_or_else(|| AppError::validation("Field 'deadline' must be a valid date"))?,
            ),
            _ => None,
        };

        Ok(Self {
            name,
            description: text(payload, "description")?,
            deadline,
            completed: flag(payload.get("completed")),
            assigned_user: assignee(payload.get("assignedUser"))?,
            assigned_user_name: text(payload, "assignedUserName")?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pending_tasks: Option<Vec<String>>,
}

impl UserForm {
    /// Body of `POST /api/users`: `name` and `email` are required.
    pub fn for_create(payload: &Payload) -> AppResult<Self> {
        let form = Self::for_update(payload)?;
        if form.name.is_none() {
            return Err(AppError::required("name"));
        }
        if form.email.is_none() {
            return Err(AppError::required("email"));
        }
        Ok(form)
    }

    /// Body of `PUT /api/users/:id`. A supplied but empty or null `name` or
    /// `email` is rejected rather than ignored.
    pub fn for_update(payload: &Payload) -> AppResult<Self> {
        let name = required_text(payload, "name")?;
        let email = required_text(payload, "email")?;
        let pending_tasks = payload
            .get("pendingTasks")
            .map(normalize_pending_tasks)
            .transpose()?;

        Ok(Self {
            name,
            email,
            pending_tasks,
        })
    }
}

fn is_supplied(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn text(payload: &Payload, field: &str) -> AppResult<Option<String>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(AppError::validation(format!(
            "Field '{}' must be a string",
            field
        ))),
    }
}

// Like `text`, but a present key must carry a non-empty value.
fn required_text(payload: &Payload, field: &str) -> AppResult<Option<String>> {
    if !payload.contains_key(field) {
        return Ok(None);
    }
    match text(payload, field)? {
        Some(value) if !value.is_empty() => Ok(Some(value)),
        _ => Err(AppError::required(field)),
    }
}

fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan())),
        Value::Array(_) | Value::Object(_) => Some(true),
    }
}

// null or blank clears the assignment.
fn assignee(value: Option<&Value>) -> AppResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(String::new())),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(AppError::validation("Field 'assignedUser' must be a string")),
    }
}

/// Coerces a deadline: numbers and digit strings are epoch milliseconds,
/// anything else must be a recognizable date string. Years outside
/// 0000-9999 have no RFC 3339 form and are rejected.
pub fn parse_deadline(value: &Value) -> Option<DateTime<Utc>> {
    let deadline = match value {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => parse_date(s.trim()),
        _ => None,
    }?;
    (0..=9999).contains(&deadline.year()).then_some(deadline)
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Accepts a JSON array, a string holding a JSON array, or a comma separated
/// string. Ids come back trimmed, non-empty and de-duplicated in first-seen
/// order.
pub fn normalize_pending_tasks(value: &Value) -> AppResult<Vec<String>> {
    let raw: Vec<String> = match value {
        Value::Array(items) => ids_from_array(items)?,
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => ids_from_array(&items)?,
            Ok(_) => vec![s.clone()],
            Err(_) => s.split(',').map(|part| part.to_string()).collect(),
        },
        _ => return Err(AppError::validation("Field 'pendingTasks' must be an array")),
    };

    let mut ids: Vec<String> = Vec::with_capacity(raw.len());
    for id in raw {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

fn ids_from_array(items: &[Value]) -> AppResult<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(AppError::validation(
                "Field 'pendingTasks' must contain task ids",
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn deadline_accepts_millis_digits_and_dates() {
        let expected = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_deadline(&json!(1735689600000i64)), Some(expected));
        assert_eq!(parse_deadline(&json!("1735689600000")), Some(expected));
        assert_eq!(parse_deadline(&json!("2025-01-01")), Some(expected));
        assert_eq!(parse_deadline(&json!("2025-01-01T00:00:00.000Z")), Some(expected));
        assert_eq!(parse_deadline(&json!("2025-01-01 00:00")), Some(expected));
        assert_eq!(parse_deadline(&json!("Wed, 01 Jan 2025 00:00:00 +0000")), Some(expected));
    }

    #[test]
    fn deadline_rejects_garbage() {
        assert_eq!(parse_deadline(&json!("next tuesday")), None);
        assert_eq!(parse_deadline(&json!("2025-13-45")), None);
        assert_eq!(parse_deadline(&json!(true)), None);
    }

    #[test]
    fn deadline_must_fit_four_digit_years() {
        let last = parse_deadline(&json!(253402300799999i64)).unwrap();
        assert_eq!(crate::models::timestamp::format(&last), "9999-12-31T23:59:59.999Z");

        assert_eq!(parse_deadline(&json!(253402300800000i64)), None);
        assert_eq!(parse_deadline(&json!("253402300800000")), None);
        assert_eq!(parse_deadline(&json!(-62167219200001i64)), None);

        let err = TaskForm::for_create(&payload(json!({"name": "far", "deadline": 253402300800000i64})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Field 'deadline' must be a valid date");
    }

    #[test]
    fn create_task_requires_name_then_deadline() {
        let err = TaskForm::for_create(&payload(json!({"deadline": "2025-01-01"}))).unwrap_err();
        assert_eq!(err.to_string(), "Field 'name' is required");

        let err = TaskForm::for_create(&payload(json!({"name": "x", "deadline": ""}))).unwrap_err();
        assert_eq!(err.to_string(), "Field 'deadline' is required");

        let err = TaskForm::for_create(&payload(json!({"name": "x", "deadline": "soon"}))).unwrap_err();
        assert_eq!(err.to_string(), "Field 'deadline' must be a valid date");
    }

    #[test]
    fn task_flags_and_assignee_are_coerced() {
        let form = TaskForm::for_update(&payload(json!({
            "completed": "TRUE",
            "assignedUser": "   ",
        })))
        .unwrap();
        assert_eq!(form.completed, Some(true));
        assert_eq!(form.assigned_user.as_deref(), Some(""));

        let form = TaskForm::for_update(&payload(json!({"completed": "", "assignedUser": null}))).unwrap();
        assert_eq!(form.completed, None);
        assert_eq!(form.assigned_user.as_deref(), Some(""));

        let form = TaskForm::for_update(&payload(json!({"completed": 0}))).unwrap();
        assert_eq!(form.completed, Some(false));
        assert_eq!(form.assigned_user, None);
    }

    #[test]
    fn user_update_rejects_blank_required_fields() {
        let err = UserForm::for_update(&payload(json!({"email": ""}))).unwrap_err();
        assert_eq!(err.to_string(), "Field 'email' is required");
        let err = UserForm::for_update(&payload(json!({"name": null}))).unwrap_err();
        assert_eq!(err.to_string(), "Field 'name' is required");
        assert_eq!(UserForm::for_update(&payload(json!({}))).unwrap(), UserForm::default());
    }

    #[test]
    fn pending_tasks_normalization() {
        assert_eq!(
            normalize_pending_tasks(&json!(["a", "b", "a"])).unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            normalize_pending_tasks(&json!("[\"a\",\"b\"]")).unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            normalize_pending_tasks(&json!(" a, b ,,c")).unwrap(),
            vec!["a", "b", "c"]
        );
        assert_eq!(normalize_pending_tasks(&json!("")).unwrap(), Vec::<String>::new());
        assert!(normalize_pending_tasks(&json!(null)).is_err());
        assert!(normalize_pending_tasks(&json!({"a": 1})).is_err());
        assert!(normalize_pending_tasks(&json!([{"id": "a"}])).is_err());
    }
}
