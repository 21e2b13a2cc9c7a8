//! Optional dotted-path access over JSON-like trees.
//!
//! Paths are dot separated (`context.token.jwt`). A segment that parses as
//! an unsigned integer also indexes into arrays. Absent intermediates yield
//! `None` instead of an error.

use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Looks up the value at `path`, if every segment resolves.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, child)
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    segments(path).try_fold(root, |node, segment| child_mut(node, segment))
}

/// Looks up `path` where the first segment is a key of `map`.
pub fn get_in<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, rest) = split_head(path);
    let first = map.get(head)?;
    match rest {
        Some(rest) => get(first, rest),
        None => Some(first),
    }
}

/// Mutable variant of [`get_in`].
pub fn get_in_mut<'a>(map: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let (head, rest) = split_head(path);
    let first = map.get_mut(head)?;
    match rest {
        Some(rest) => get_mut(first, rest),
        None => Some(first),
    }
}

/// Replaces the value at `path` when it already exists.
///
/// Returns `false` (and leaves the tree untouched) when the path does not
/// resolve; missing intermediates are never created.
pub fn set_existing(map: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    match get_in_mut(map, path) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Reads a string-ish scalar at `path`. Numbers and booleans are rendered
/// with their JSON text; anything else is treated as absent.
pub fn get_string(root: &Value, path: &str) -> Option<String> {
    match get(root, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn split_head(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}
