//! Path helpers over `serde_json::Value` matching the framework's JSON utilities
//! (`eraseValue`, `isEmpty`, `mergeJson`).

use serde_json::{Map, Value};

/// Remove and return the value at `path`.
///
/// Parents left empty by the removal are removed too, so a fully consumed
/// configuration collapses to `{}`.
pub fn take_path(js: &mut Value, path: &[String]) -> Option<Value> {
    let (key, rest) = path.split_first()?;
    let object = js.as_object_mut()?;
    if rest.is_empty() {
        return object.remove(key);
    }
    let child = object.get_mut(key)?;
    let taken = take_path(child, rest);
    if taken.is_some() && is_empty(child) {
        object.remove(key);
    }
    taken
}

/// Write `value` at `path`, creating intermediate objects.
///
/// A non-object node on the way is replaced by an object.
pub fn set_path(js: &mut Value, path: &[String], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *js = value;
        return;
    };
    if !js.is_object() {
        *js = Value::Object(Map::new());
    }
    if let Value::Object(object) = js {
        let child = object.entry(key.clone()).or_insert(Value::Null);
        set_path(child, rest, value);
    }
}

/// `null`, `{}` and `[]` count as empty.
pub fn is_empty(js: &Value) -> bool {
    match js {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Fill keys missing from `target` with values from `defaults`, recursing into objects.
///
/// Values already present in `target` are never overwritten.
pub fn merge_json(target: &mut Value, defaults: &Value) {
    let Value::Object(defaults) = defaults else {
        return;
    };
    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target) = target else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(existing) if existing.is_object() && default.is_object() => {
                merge_json(existing, default)
            }
            Some(_) => {}
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_take_path_prunes_empty_parents() {
        let mut js = json!({"Mu": {"Value": 0.5}, "Population Size": 8});
        assert_eq!(take_path(&mut js, &path(&["Mu", "Value"])), Some(json!(0.5)));
        assert_eq!(js, json!({"Population Size": 8}));
        assert_eq!(take_path(&mut js, &path(&["Missing"])), None);
    }

    #[test]
    fn test_take_path_keeps_non_empty_parents() {
        let mut js = json!({"Mu": {"Value": 0.5, "Type": "Linear"}});
        take_path(&mut js, &path(&["Mu", "Value"]));
        assert_eq!(js, json!({"Mu": {"Type": "Linear"}}));
    }

    #[test]
    fn test_set_path_creates_objects() {
        let mut js = json!({});
        set_path(&mut js, &path(&["Mu", "Value"]), json!(0.5));
        set_path(&mut js, &path(&["Mu", "Type"]), json!("Linear"));
        assert_eq!(js, json!({"Mu": {"Value": 0.5, "Type": "Linear"}}));
    }

    #[test]
    fn test_merge_json_never_overwrites() {
        let mut js = json!({"A": 1, "Nested": {"X": true}});
        merge_json(&mut js, &json!({"A": 2, "B": 3, "Nested": {"X": false, "Y": 4}}));
        assert_eq!(js, json!({"A": 1, "B": 3, "Nested": {"X": true, "Y": 4}}));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&json!({})));
        assert!(is_empty(&Value::Null));
        assert!(!is_empty(&json!({"A": 1})));
        assert!(!is_empty(&json!(0)));
    }
}
