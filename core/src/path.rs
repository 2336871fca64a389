//! Path based field selection over parsed JSON.
//!
//! A path is a list of segments separated by `.`:
//!
//! - `ret` selects the field `ret` of the root object,
//! - `data.items.0.id` walks nested objects, numeric segments index arrays,
//! - `data.items[0].id` is the same selection with bracket indexing,
//! - `a\.b` selects the field literally named `a.b`.
//!
//! Selection is total: a missing field, an out of range index or a type
//! mismatch yields `None`, never a panic.

use serde_json::Value;

/// Select the value at `path` inside `value`.
///
/// An empty path selects nothing.
///
/// ```
/// use reqcall_core::select;
/// use serde_json::json;
///
/// let body = json!({"data": {"items": [{"id": 7}]}});
/// assert_eq!(select(&body, "data.items.0.id"), Some(&json!(7)));
/// assert_eq!(select(&body, "data.items[0].id"), Some(&json!(7)));
/// assert_eq!(select(&body, "data.missing"), None);
/// ```
pub fn select<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = value;
    for segment in split_segments(path) {
        let (name, indexes) = split_indexes(&segment)?;
        if !name.is_empty() || indexes.is_empty() {
            current = step(current, name)?;
        }
        for idx in indexes {
            current = current.as_array()?.get(idx)?;
        }
    }
    Some(current)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Split on unescaped dots, dropping the escape characters.
fn split_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Split `items[0][1]` into `("items", [0, 1])`.
///
/// Returns `None` for a malformed bracket suffix.
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    if !segment.ends_with(']') {
        return Some((segment, Vec::new()));
    }

    let (name, mut rest) = segment.split_at(open);
    let mut indexes = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((name, indexes))
}
