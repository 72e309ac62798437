//! Field-level diffs between two JSON snapshots

use serde_json::{Map, Value};

const MAX_STRING_CHARS: usize = 40;

/// Summarize what changed between `before` and `after`
///
/// Nested objects are walked and reported with dotted paths
/// (`policy.max_deposit: 1000 -> 5000`). Returns `None` when nothing changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let mut changes = Vec::new();
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => diff_objects("", b, a, &mut changes),
        _ if before != after => changes.push(format!("{} -> {}", render(before), render(after))),
        _ => {}
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn diff_objects(prefix: &str, before: &Map<String, Value>, after: &Map<String, Value>, out: &mut Vec<String>) {
    let path = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    for (key, old) in before {
        match after.get(key) {
            Some(Value::Object(new_obj)) if old.is_object() => {
                if let Value::Object(old_obj) = old {
                    diff_objects(&path(key), old_obj, new_obj, out);
                }
            }
            Some(new) if new != old => {
                out.push(format!("{}: {} -> {}", path(key), render(old), render(new)));
            }
            Some(_) => {}
            None => out.push(format!("{}: {} -> (removed)", path(key), render(old))),
        }
    }

    for (key, new) in after {
        if !before.contains_key(key) {
            out.push(format!("{}: (added) -> {}", path(key), render(new)));
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_CHARS => {
            let head: String = s.chars().take(MAX_STRING_CHARS - 3).collect();
            format!("\"{}...\"", head)
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_fields_only() {
        let before = json!({"name": "Alice", "balance": 1000, "version": 3});
        let after = json!({"name": "Alice", "balance": 800, "version": 4});

        let diff = generate_diff(&before, &after).unwrap();
        assert_eq!(diff, "balance: 1000 -> 800, version: 3 -> 4");
    }

    #[test]
    fn test_nested_objects_use_dotted_paths() {
        let before = json!({"policy": {"max_deposit": 1000, "allow_negative_balance": true}});
        let after = json!({"policy": {"max_deposit": 5000, "allow_negative_balance": true}});

        let diff = generate_diff(&before, &after).unwrap();
        assert_eq!(diff, "policy.max_deposit: 1000 -> 5000");
    }

    #[test]
    fn test_added_and_removed() {
        let diff = generate_diff(&json!({"old": "x"}), &json!({"new": 1})).unwrap();
        assert!(diff.contains("old: \"x\" -> (removed)"));
        assert!(diff.contains("new: (added) -> 1"));
    }

    #[test]
    fn test_no_changes() {
        let v = json!({"status": "PENDING"});
        assert!(generate_diff(&v, &v).is_none());
        assert!(generate_diff(&json!(1), &json!(1)).is_none());
    }

    #[test]
    fn test_long_strings_are_truncated_on_char_boundaries() {
        let long = "é".repeat(60);
        let diff = generate_diff(&json!({"justification": long}), &json!({"justification": ""}))
            .unwrap();
        assert!(diff.contains("...\" -> \"\""));
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(generate_diff(&json!(true), &json!(false)).unwrap(), "true -> false");
        assert_eq!(render(&json!([1, 2])), "[2 items]");
        assert_eq!(render(&json!(null)), "null");
    }
}
