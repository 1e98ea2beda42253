//! `select` projection: wildcard, exclusion, dotted inclusion, and
//! whole-array/nested-object grouping.

use serde_json::{Map, Value};

/// Apply a `select` expression list to `doc`.
///
/// - `"*"` present → clone `doc` then apply exclusions.
/// - Empty `select` → clone `doc` (computed fields, if any, are expected to
///   already be present on `doc` by the time this is called).
/// - Otherwise → build the result from only the included paths, then apply
///   exclusions.
pub fn project(doc: &Value, select: &[String]) -> Value {
    let wildcard = select.iter().any(|s| s == "*");
    let exclusions: Vec<Vec<String>> = select
        .iter()
        .filter(|s| s.starts_with('-'))
        .map(|s| s[1..].split('.').map(str::to_string).collect())
        .collect();

    let mut result = if wildcard || select.is_empty() {
        doc.clone()
    } else {
        let inclusions: Vec<Vec<String>> = select
            .iter()
            .filter(|s| *s != "*" && !s.starts_with('-'))
            .map(|s| s.split('.').map(str::to_string).collect())
            .collect();
        include_paths(doc, &inclusions)
    };

    for path in &exclusions {
        delete_path(&mut result, path);
    }
    result
}

fn include_paths(doc: &Value, paths: &[Vec<String>]) -> Value {
    let Value::Object(source) = doc else {
        return doc.clone();
    };

    let mut groups: Vec<(String, Vec<Vec<String>>)> = Vec::new();
    for path in paths {
        if path.is_empty() {
            continue;
        }
        let head = path[0].clone();
        let rest = path[1..].to_vec();
        match groups.iter_mut().find(|(k, _)| *k == head) {
            Some((_, rests)) => rests.push(rest),
            None => groups.push((head, vec![rest])),
        }
    }

    let mut out = Map::new();
    for (key, rests) in groups {
        let Some(value) = source.get(&key) else {
            continue;
        };
        let whole_requested = rests.iter().any(|r| r.is_empty());
        if whole_requested {
            out.insert(key, value.clone());
            continue;
        }
        out.insert(key, project_nested(value, &rests));
    }
    Value::Object(out)
}

fn project_nested(value: &Value, rests: &[Vec<String>]) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| project_nested(item, rests)).collect())
        }
        Value::Object(_) => include_paths(value, rests),
        other => other.clone(),
    }
}

fn delete_path(value: &mut Value, segments: &[String]) {
    if segments.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            if segments.len() == 1 {
                map.remove(&segments[0]);
            } else if let Some(sub) = map.get_mut(&segments[0]) {
                delete_path(sub, &segments[1..]);
            }
        }
        // Deleting a field from an array deletes it from every element.
        Value::Array(items) => {
            for item in items.iter_mut() {
                delete_path(item, segments);
            }
        }
        _ => {}
    }
}
