//! Dotted path addressing over `serde_json::Value` trees.
//!
//! Paths are dot-separated segments such as `imdata.0.l1PhysIf.attributes.id`.
//! A backslash escapes the next character, so `a\.b` addresses the single key
//! `a.b`. Numeric segments index arrays, and `-1` appends when writing.

use serde_json::{Map, Value};

/// Segment that appends to an array on write.
const APPEND: &str = "-1";

/// Most null slots a single write may pad an array with.
const MAX_ARRAY_PADDING: usize = 1024;

/// How a segment addresses an array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Index(usize),
    Append,
}

impl Position {
    fn parse(segment: &str) -> Option<Self> {
        if segment == APPEND {
            return Some(Position::Append);
        }
        index(segment).map(Position::Index)
    }
}

/// Parses a segment made only of ASCII digits.
fn index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Splits a path into its segments.
///
/// Returns `None` for an empty path, which addresses nothing.
pub(crate) fn parse(path: &str) -> Option<Vec<String>> {
    if path.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    Some(segments)
}

/// Looks up the value at `segments`, if every step exists.
pub(crate) fn get<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = match node {
            Value::Object(map) => map.get(segment.as_str())?,
            Value::Array(items) => items.get(index(segment)?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Writes `value` at `segments`, creating containers along the way.
///
/// Returns `false` if an index lies too far past the end of its array. `root`
/// may already be reshaped at that point, so callers must discard it.
pub(crate) fn set(root: &mut Value, segments: &[String], value: Value) -> bool {
    let mut node = root;
    for segment in segments {
        node = match child_mut(node, segment) {
            Some(child) => child,
            None => return false,
        };
    }
    *node = value;
    true
}

/// Removes the value at `segments`. Returns `false` when nothing was there.
pub(crate) fn delete(root: &mut Value, segments: &[String]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => match map.get_mut(segment.as_str()) {
                Some(child) => child,
                None => return false,
            },
            Value::Array(items) => match index(segment).and_then(|i| items.get_mut(i)) {
                Some(child) => child,
                None => return false,
            },
            _ => return false,
        };
    }

    match node {
        Value::Object(map) => map.shift_remove(last.as_str()).is_some(),
        Value::Array(items) => match index(last) {
            Some(i) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Returns the slot addressed by `segment` under `node`, reshaping `node`
/// into the container the segment needs.
fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    let position = Position::parse(segment);

    let fits = match position {
        Some(_) => node.is_array() || node.is_object(),
        None => node.is_object(),
    };
    if !fits {
        *node = match position {
            Some(_) => Value::Array(Vec::new()),
            None => Value::Object(Map::new()),
        };
    }

    match (position, node) {
        (Some(position), Value::Array(items)) => {
            let slot = match position {
                Position::Index(i) => i,
                Position::Append => items.len(),
            };
            if slot.saturating_sub(items.len()) > MAX_ARRAY_PADDING {
                tracing::debug!(index = slot, len = items.len(), "Array index out of reach");
                return None;
            }
            if items.len() <= slot {
                items.resize(slot.checked_add(1)?, Value::Null);
            }
            items.get_mut(slot)
        }
        (_, node) => Some(&mut node[segment]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segments(path: &str) -> Vec<String> {
        parse(path).unwrap()
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(segments("a.b.0"), vec!["a", "b", "0"]);
        assert_eq!(segments(r"sys\.bgp.name"), vec!["sys.bgp", "name"]);
        assert!(parse("").is_none());
    }

    #[test]
    fn test_numeric_segment_creates_array() {
        let mut root = Value::Null;
        assert!(set(&mut root, &segments("imdata.1.name"), json!("b")));
        assert_eq!(root, json!({"imdata": [null, {"name": "b"}]}));
    }

    #[test]
    fn test_index_far_past_the_end_is_refused() {
        let mut root = json!({"a": [1]});
        assert!(!set(&mut root, &segments("a.18446744073709551615"), json!("x")));

        let mut root = json!({"a": [1]});
        assert!(!set(&mut root, &segments("a.999999999999"), json!("x")));

        let mut root = json!({"a": [1]});
        let edge = format!("a.{}", 1 + MAX_ARRAY_PADDING);
        assert!(set(&mut root, &segments(&edge), json!("x")));
        assert_eq!(root["a"].as_array().map(Vec::len), Some(MAX_ARRAY_PADDING + 2));
    }

    #[test]
    fn test_numeric_segment_on_object_is_a_key() {
        let mut root = json!({"a": {}});
        assert!(set(&mut root, &segments("a.0"), json!("x")));
        assert_eq!(root, json!({"a": {"0": "x"}}));
    }

    #[test]
    fn test_append_segment() {
        let mut root = json!({"list": [1]});
        assert!(set(&mut root, &segments("list.-1"), json!(2)));
        assert_eq!(root, json!({"list": [1, 2]}));
    }

    #[test]
    fn test_scalar_in_the_way_is_replaced() {
        let mut root = json!({"a": "scalar"});
        assert!(set(&mut root, &segments("a.b"), json!(true)));
        assert_eq!(root, json!({"a": {"b": true}}));
    }

    #[test]
    fn test_get_walks_arrays_and_objects() {
        let root = json!({"imdata": [{"x": {"id": "eth1/1"}}]});
        assert_eq!(
            get(&root, &segments("imdata.0.x.id")),
            Some(&json!("eth1/1"))
        );
        assert_eq!(get(&root, &segments("imdata.1.x.id")), None);
        assert_eq!(get(&root, &segments("imdata.x")), None);
    }

    #[test]
    fn test_delete_reports_missing_paths() {
        let mut root = json!({"a": {"name": "a", "keep": 1}, "list": [1, 2]});
        assert!(delete(&mut root, &segments("a.name")));
        assert!(!delete(&mut root, &segments("a.name")));
        assert!(!delete(&mut root, &segments("missing.deeper")));
        assert!(delete(&mut root, &segments("list.0")));
        assert_eq!(root, json!({"a": {"keep": 1}, "list": [2]}));
    }
}
