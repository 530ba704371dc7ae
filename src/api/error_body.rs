//! Backend error body normalization
//!
//! The backend reports failures as `{"detail": "..."}` or, for request
//! validation failures, as `{"detail": [{"loc": [...], "msg": "..."}, ...]}`.
//! Both collapse into one display string here.

use reqwest::StatusCode;
use serde_json::Value;

/// Turn a non-success response body into a single message.
///
/// - list `detail`: each entry as `loc.joined.by.dots - msg`, joined by `; `;
///   if any entry has no `loc` array the status fallback is used instead
/// - string `detail`: the string itself
/// - other JSON: the compact JSON text of the whole body
/// - not JSON: `HTTP error! Status: <code>`
///
/// # Examples
///
/// ```
/// use pdfchat::api::extract_error_message;
/// use reqwest::StatusCode;
///
/// let body = r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#;
/// assert_eq!(
///     extract_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
///     "body.question - field required"
/// );
/// assert_eq!(
///     extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
///     "HTTP error! Status: 500"
/// );
/// ```
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return status_fallback(status),
    };

    match value.get("detail") {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(format_field_error)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join("; "))
            .unwrap_or_else(|| status_fallback(status)),
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        _ => value.to_string(),
    }
}

fn format_field_error(entry: &Value) -> Option<String> {
    let loc = entry
        .get("loc")
        .and_then(Value::as_array)?
        .iter()
        .map(|part| match part {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".");
    let msg = entry.get("msg").and_then(Value::as_str).unwrap_or_default();
    Some(format!("{} - {}", loc, msg))
}

fn status_fallback(status: StatusCode) -> String {
    format!("HTTP error! Status: {}", status.as_u16())
}
