use axum::{
    async_trait,
    body::Bytes,
    extract::{Form, FromRequest, Request},
    http::header,
};
use serde_json::{Map, Value};
use crate::errors::AppError;

/// Mutation body as a JSON object, read from either a JSON or a url-encoded
/// form body. Repeated form keys (and `key[]`) become arrays.
pub struct Payload(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("Invalid form body: {}", e.body_text())))?;
            return Ok(Payload(group_form_pairs(pairs)));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload(Map::new()));
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Payload(map)),
            Ok(_) => Err(AppError::validation("Request body must be a JSON object")),
            Err(e) => Err(AppError::validation(format!("Invalid JSON body: {}", e))),
        }
    }
}

fn group_form_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        let (key, forced_array) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key, false),
        };
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None if forced_array => {
                map.insert(key, Value::Array(vec![Value::String(value)]));
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    map
}
