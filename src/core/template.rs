//! JSON response templates.
//!
//! Strings inside a template may hold `{{ request.* }}` placeholders. A string
//! made of a single placeholder is replaced by the resolved JSON value with its
//! type intact; otherwise the placeholders are interpolated as text.
//!
//! Supported expressions:
//! - `request.method`, `request.path`, `request.url`
//! - `request.path.N` for the N-th non-empty path segment
//! - `request.query.NAME`, `request.headers.NAME`
//! - `request.body`, `request.body.key.0.key` (negative indices count from the end)

use crate::domain::model::RequestSnapshot;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is a valid regex")
});

/// Render `template` against the captured request.
pub fn render(template: &Value, request: &RequestSnapshot) -> Value {
    match template {
        Value::String(text) => render_string(text, request),
        Value::Array(items) => Value::Array(items.iter().map(|item| render(item, request)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), render(value, request)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Whether `template` references the request at all.
pub fn has_placeholders(template: &Value) -> bool {
    match template {
        Value::String(text) => PLACEHOLDER.is_match(text),
        Value::Array(items) => items.iter().any(has_placeholders),
        Value::Object(map) => map.values().any(has_placeholders),
        _ => false,
    }
}

fn render_string(text: &str, request: &RequestSnapshot) -> Value {
    let Some(caps) = PLACEHOLDER.captures(text) else {
        return Value::String(text.to_string());
    };

    if let Some(whole) = caps.get(0) {
        if whole.start() == 0 && whole.end() == text.len() {
            return resolve(&caps[1], request).unwrap_or(Value::Null);
        }
    }

    let rendered = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        match resolve(&caps[1], request) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    });
    Value::String(rendered.into_owned())
}

/// Resolve one placeholder expression, `None` when it points at nothing.
pub fn resolve(expr: &str, request: &RequestSnapshot) -> Option<Value> {
    let mut parts = expr.split('.');
    if parts.next()? != "request" {
        tracing::debug!("Unknown template root in '{}'", expr);
        return None;
    }
    let field = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    match (field, rest.as_slice()) {
        ("method", []) => Some(Value::String(request.method.clone())),
        ("path", []) => Some(Value::String(request.path.clone())),
        ("url", []) => Some(Value::String(request.url.clone())),
        ("path", [index]) => position(request.segments.len(), index)
            .and_then(|i| request.segments.get(i))
            .map(|segment| Value::String(segment.clone())),
        ("query", [name]) => request.query.get(*name).map(|v| Value::String(v.clone())),
        ("headers", [name]) => request
            .headers
            .get(&name.to_lowercase())
            .map(|v| Value::String(v.clone())),
        ("body", keys) => lookup(&request.body, keys).cloned(),
        _ => None,
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(*key),
        Value::Array(items) => position(items.len(), key).and_then(|i| items.get(i)),
        _ => None,
    })
}

fn position(len: usize, key: &str) -> Option<usize> {
    let index: i64 = key.parse().ok()?;
    if index < 0 {
        len.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)
    } else {
        usize::try_from(index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_request() -> RequestSnapshot {
        RequestSnapshot::new("POST", "/t/request/json")
            .with_header("X-Trace", "abc")
            .with_json_body(json!({
                "req_id": 123,
                "req_name": "foo",
                "data": [{"id": 0}, {"id": 456}]
            }))
    }

    #[test]
    fn test_whole_placeholder_keeps_type() {
        let request = echo_request();
        let rendered = render(
            &json!({
                "id": "{{request.body.req_id}}",
                "name": "{{ request.body.req_name }}",
                "second": "{{request.body.data.1.id}}",
                "last": "{{request.body.data.-1.id}}"
            }),
            &request,
        );
        assert_eq!(
            rendered,
            json!({"id": 123, "name": "foo", "second": 456, "last": 456})
        );
    }

    #[test]
    fn test_request_line_fields() {
        let request = echo_request();
        let rendered = render(
            &json!([
                "{{request.method}}",
                "{{request.path}}",
                "{{request.url}}",
                "{{request.path.0}}",
                "{{request.path.1}}",
                "{{request.path.2}}",
                "{{request.path.-1}}"
            ]),
            &request,
        );
        assert_eq!(
            rendered,
            json!(["POST", "/t/request/json", "/t/request/json", "t", "request", "json", "json"])
        );
    }

    #[test]
    fn test_interpolation_inside_text() {
        let request = RequestSnapshot::new("GET", "/users/42?lang=en").with_header("x-trace", "abc");
        let rendered = render(
            &json!("user {{request.path.1}} ({{request.query.lang}}) trace={{request.headers.X-Trace}} missing=[{{request.body.nope}}]"),
            &request,
        );
        assert_eq!(rendered, json!("user 42 (en) trace=abc missing=[]"));
    }

    #[test]
    fn test_non_string_values_interpolate_as_json() {
        let request = echo_request();
        let rendered = render(&json!("id={{request.body.req_id}} data={{request.body.data.0}}"), &request);
        assert_eq!(rendered, json!(r#"id=123 data={"id":0}"#));
    }

    #[test]
    fn test_missing_values_become_null() {
        let request = echo_request();
        let rendered = render(
            &json!({
                "a": "{{request.body.data.5.id}}",
                "b": "{{request.path.9}}",
                "c": "{{response.code}}",
                "d": "{{request.body.data.-3}}"
            }),
            &request,
        );
        assert_eq!(rendered, json!({"a": null, "b": null, "c": null, "d": null}));
    }

    #[test]
    fn test_plain_values_untouched() {
        let request = echo_request();
        let template = json!({"code": 1, "msg": "normal return", "{{request.method}}": true});
        assert_eq!(render(&template, &request), template);
        assert!(!has_placeholders(&json!({"code": 1, "msg": "normal return"})));
        assert!(has_placeholders(&json!({"nested": ["{{request.url}}"]})));
    }
}
