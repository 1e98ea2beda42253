//! Filter operators and dot-path existential matching.

use serde_json::Value;
use std::collections::HashMap;

/// A field's matcher: either a bare scalar (implicit equality) or an
/// explicit set of operators.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    Scalar(Value),
    Ops(FieldOps),
}

#[derive(Debug, Clone, Default)]
pub struct FieldOps {
    pub eq: Option<Value>,
    pub neq: Option<Value>,
    pub contains: Option<String>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    pub in_: Option<Vec<Value>>,
    pub exists: Option<bool>,
}

/// `where` clause: field path (possibly dotted) to matcher.
pub type WhereClause = HashMap<String, FieldMatcher>;

impl FieldMatcher {
    /// Does `value` satisfy this matcher?
    fn matches_scalar(&self, value: Option<&Value>) -> bool {
        match self {
            FieldMatcher::Scalar(expected) => value == Some(expected),
            FieldMatcher::Ops(ops) => ops.matches(value),
        }
    }
}

impl FieldOps {
    fn matches(&self, value: Option<&Value>) -> bool {
        if let Some(exists) = self.exists {
            let present = value.is_some_and(|v| !v.is_null());
            if present != exists {
                return false;
            }
        }
        if let Some(eq) = &self.eq {
            if value != Some(eq) {
                return false;
            }
        }
        if let Some(neq) = &self.neq {
            if value == Some(neq) {
                return false;
            }
        }
        if let Some(needle) = &self.contains {
            let Some(Value::String(haystack)) = value else {
                return false;
            };
            if !haystack.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(gt) = &self.gt {
            if !compare(value, gt, |o| o == std::cmp::Ordering::Greater) {
                return false;
            }
        }
        if let Some(gte) = &self.gte {
            if !compare(value, gte, |o| o != std::cmp::Ordering::Less) {
                return false;
            }
        }
        if let Some(lt) = &self.lt {
            if !compare(value, lt, |o| o == std::cmp::Ordering::Less) {
                return false;
            }
        }
        if let Some(lte) = &self.lte {
            if !compare(value, lte, |o| o != std::cmp::Ordering::Greater) {
                return false;
            }
        }
        if let Some(options) = &self.in_ {
            match value {
                Some(v) => {
                    if !options.contains(v) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

fn compare(value: Option<&Value>, rhs: &Value, ok: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    match (value, rhs) {
        (Some(Value::Number(a)), Value::Number(b)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(&ok),
                _ => false,
            }
        }
        (Some(Value::String(a)), Value::String(b)) => ok(a.as_str().cmp(b.as_str())),
        _ => false,
    }
}

/// Resolve `path` (dot-separated) against `doc`, array-aware: whenever an
/// intermediate step hits an array, evaluation maps into every element and
/// the match succeeds if any element matches (existential semantics).
pub fn path_matches(doc: &Value, path: &str, matcher: &FieldMatcher) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    matches_at(doc, &segments, matcher)
}

fn matches_at(value: &Value, segments: &[&str], matcher: &FieldMatcher) -> bool {
    if segments.is_empty() {
        return matcher.matches_scalar(Some(value));
    }
    match value {
        Value::Array(items) => items.iter().any(|item| matches_at(item, segments, matcher)),
        Value::Object(map) => {
            let (head, rest) = (segments[0], &segments[1..]);
            match map.get(head) {
                Some(next) => matches_at(next, rest, matcher),
                None => matcher.matches_scalar(None),
            }
        }
        _ => matcher.matches_scalar(None),
    }
}

/// Evaluate an entire `where` clause (every field must match) against `doc`.
pub fn evaluate_where(doc: &Value, clause: &WhereClause) -> bool {
    clause.iter().all(|(path, matcher)| path_matches(doc, path, matcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_equality_matches_top_level_field() {
        let doc = json!({"state": "completed"});
        let matcher = FieldMatcher::Scalar(json!("completed"));
        assert!(path_matches(&doc, "state", &matcher));
    }

    #[test]
    fn dot_path_maps_into_arrays_existentially() {
        let doc = json!({"outputs": [{"type": "other"}, {"type": "pullRequest"}]});
        let matcher = FieldMatcher::Scalar(json!("pullRequest"));
        assert!(path_matches(&doc, "outputs.type", &matcher));

        let matcher_missing = FieldMatcher::Scalar(json!("nonexistent"));
        assert!(!path_matches(&doc, "outputs.type", &matcher_missing));
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let doc = json!({"title": "Fix the Parser Bug"});
        let matcher = FieldMatcher::Ops(FieldOps {
            contains: Some("parser".into()),
            ..Default::default()
        });
        assert!(path_matches(&doc, "title", &matcher));
    }

    #[test]
    fn exists_true_excludes_null_and_missing() {
        let doc = json!({"a": null});
        let matcher = FieldMatcher::Ops(FieldOps {
            exists: Some(true),
            ..Default::default()
        });
        assert!(!path_matches(&doc, "a", &matcher));
        assert!(!path_matches(&doc, "missing", &matcher));
    }

    #[test]
    fn gt_lt_compare_numbers() {
        let doc = json!({"count": 5});
        let gt3 = FieldMatcher::Ops(FieldOps {
            gt: Some(json!(3)),
            ..Default::default()
        });
        let lt3 = FieldMatcher::Ops(FieldOps {
            lt: Some(json!(3)),
            ..Default::default()
        });
        assert!(path_matches(&doc, "count", &gt3));
        assert!(!path_matches(&doc, "count", &lt3));
    }
}
