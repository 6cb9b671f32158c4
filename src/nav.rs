//! Safe navigation over untyped positional payloads.
//!
//! The vendor encodes every record as nested arrays with meaning carried by
//! position. Every decoder in this crate reads through these helpers, which
//! return `None` for a short array, a missing index or a value of the wrong
//! shape instead of panicking.

use serde_json::Value;

use crate::error::{Error, Result};

/// One step into a nested array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    At(usize),
    /// The final element, whatever the array length.
    Last,
}

/// Follow `path` (array indices only) from `value`.
pub fn get<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |cur, &idx| cur.as_array()?.get(idx))
}

/// Follow a path that may contain [`Step::Last`].
pub fn get_steps<'a>(value: &'a Value, steps: &[Step]) -> Option<&'a Value> {
    steps.iter().try_fold(value, |cur, step| {
        let items = cur.as_array()?;
        match step {
            Step::At(idx) => items.get(*idx),
            Step::Last => items.last(),
        }
    })
}

pub fn str_at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a str> {
    get(value, path)?.as_str()
}

pub fn i64_at(value: &Value, path: &[usize]) -> Option<i64> {
    get(value, path)?.as_i64()
}

pub fn array_at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a [Value]> {
    get(value, path)?.as_array().map(Vec::as_slice)
}

/// A string at `path` that looks like an absolute http(s) URL.
pub fn http_url_at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a str> {
    str_at(value, path).filter(|s| s.starts_with("http"))
}

/// Non-empty string at `path`.
pub fn text_at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a str> {
    str_at(value, path).filter(|s| !s.is_empty())
}

/// Render a path the way it appears in diagnostics: `[18][0][4]`.
pub fn format_path(path: &[usize]) -> String {
    path.iter().map(|i| format!("[{i}]")).collect()
}

/// Required navigation: an array of at least `min_len` elements must sit at
/// `path`, otherwise the vendor schema changed under us.
pub fn require_array<'a>(
    value: &'a Value,
    path: &[usize],
    min_len: usize,
    kind: &str,
) -> Result<&'a [Value]> {
    match get(value, path) {
        Some(Value::Array(items)) if items.len() >= min_len => Ok(items),
        Some(Value::Array(items)) => Err(Error::structure(
            kind,
            format_path(path),
            format!(
                "expected list with at least {min_len} elements, got {}",
                items.len()
            ),
        )),
        Some(other) => Err(Error::structure(
            kind,
            format_path(path),
            format!("expected list, got {}", shape_name(other)),
        )),
        None => Err(Error::structure(kind, format_path(path), "missing")),
    }
}

pub fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_and_mistyped_paths_are_absent() {
        let v = json!([1, ["a", [null, "deep"]]]);
        assert_eq!(str_at(&v, &[1, 1, 1]), Some("deep"));
        assert!(get(&v, &[1, 5]).is_none());
        assert!(get(&v, &[0, 0]).is_none());
        assert!(str_at(&v, &[1, 1, 0]).is_none());
    }

    #[test]
    fn last_step() {
        let v = json!([["x", null, null, null, [[1], null, 2]]]);
        let marker = get_steps(&v, &[Step::At(0), Step::At(4), Step::Last]);
        assert_eq!(marker.and_then(Value::as_i64), Some(2));
        assert!(get_steps(&json!([]), &[Step::Last]).is_none());
    }

    #[test]
    fn require_array_reports_path() {
        let v = json!([[1, 2]]);
        assert!(require_array(&v, &[0], 2, "data_table").is_ok());
        let err = require_array(&v, &[0], 5, "data_table").unwrap_err();
        assert!(err.to_string().contains("[0]"));
        let err = require_array(&v, &[3], 1, "data_table").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn url_filter() {
        let v = json!(["https://a", "ftp://b"]);
        assert_eq!(http_url_at(&v, &[0]), Some("https://a"));
        assert!(http_url_at(&v, &[1]).is_none());
    }
}
