//! Input sanitizers: markup escaping and operator-key stripping.

use super::body::rewrite_json;
use super::query::rewrite_query;
use crate::error::AppError;
use axum::{extract::Request, middleware::Next, response::Response};
use serde_json::Value;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn needs_escape(s: &str) -> bool {
    s.contains(['&', '<', '>', '"', '\''])
}

/// Escape every string in a JSON tree, object keys excluded.
pub fn escape_strings(v: &mut Value) {
    match v {
        Value::String(s) if needs_escape(s) => *s = escape_html(s),
        Value::Array(items) => items.iter_mut().for_each(escape_strings),
        Value::Object(map) => map.values_mut().for_each(escape_strings),
        _ => {}
    }
}

/// Keys the document store could read as operators or paths.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Drop operator keys at every depth. Returns how many were removed.
pub fn strip_operator_keys(v: &mut Value) -> usize {
    match v {
        Value::Array(items) => items.iter_mut().map(strip_operator_keys).sum(),
        Value::Object(map) => {
            let before = map.len();
            map.retain(|k, _| !is_operator_key(k));
            let mut removed = before - map.len();
            for child in map.values_mut() {
                removed += strip_operator_keys(child);
            }
            removed
        }
        _ => 0,
    }
}

pub async fn xss_clean(req: Request, next: Next) -> Result<Response, AppError> {
    let mut req = rewrite_json(req, escape_strings)?;
    rewrite_query(&mut req, |pairs| {
        pairs
            .into_iter()
            .map(|(k, v)| (k, escape_html(&v)))
            .collect()
    })?;
    Ok(next.run(req).await)
}

pub async fn strip_injection(req: Request, next: Next) -> Result<Response, AppError> {
    let mut removed = 0;
    let mut req = rewrite_json(req, |v| removed += strip_operator_keys(v))?;
    rewrite_query(&mut req, |pairs| {
        let before = pairs.len();
        let kept: Vec<_> = pairs.into_iter().filter(|(k, _)| !is_operator_key(k)).collect();
        removed += before - kept.len();
        kept
    })?;
    if removed > 0 {
        tracing::warn!(removed, path = %req.uri().path(), "stripped operator keys from request");
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_nested_strings() {
        let mut v = json!({"name": "<script>alert('x')</script>", "tags": ["a&b", 3], "n": null});
        escape_strings(&mut v);
        assert_eq!(v["name"], "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;");
        assert_eq!(v["tags"][0], "a&amp;b");
        assert_eq!(v["tags"][1], 3);
    }

    #[test]
    fn strips_operator_keys_at_depth() {
        let mut v = json!({
            "email": {"$gt": ""},
            "$where": "1 == 1",
            "profile.role": "admin",
            "list": [{"$ne": 1, "ok": true}]
        });
        let removed = strip_operator_keys(&mut v);
        assert_eq!(removed, 4);
        assert_eq!(v, json!({"email": {}, "list": [{"ok": true}]}));
    }

    #[test]
    fn operator_key_rule() {
        assert!(is_operator_key("$where"));
        assert!(is_operator_key("province.x"));
        assert!(!is_operator_key("name[$ne]"));
        assert!(!is_operator_key("province"));
    }
}
