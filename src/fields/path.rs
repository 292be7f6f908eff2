//! Dotted-path resolution over untyped signal trees.

use serde_json::Value;

/// Resolve `path` (e.g. `ipLocation.subdivisions.0.name`) against `root`.
///
/// Each `.`-separated segment indexes an object by key or an array by a
/// numeric segment. Any hop that lands on a missing key, an out-of-range
/// index, `null`, or a scalar ends resolution with `None`. Present values are
/// returned as-is, including `0`, `false`, `""` and a terminal `null`.
pub fn resolve<'a>(root: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    let mut current = root?;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(parse_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Array keys are canonical decimal strings: "01" is not index 1.
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_nested_objects_and_arrays() {
        let data = json!({
            "ipLocation": {
                "country": { "name": "Japan" },
                "subdivisions": [{ "name": "Tokyo" }, { "name": "Osaka" }]
            }
        });
        assert_eq!(
            resolve(Some(&data), "ipLocation.country.name"),
            Some(&json!("Japan"))
        );
        assert_eq!(
            resolve(Some(&data), "ipLocation.subdivisions.1.name"),
            Some(&json!("Osaka"))
        );
        assert_eq!(resolve(Some(&data), "ipLocation.subdivisions.2.name"), None);
        assert_eq!(resolve(Some(&data), "ipLocation.subdivisions.x"), None);
        assert_eq!(resolve(Some(&data), "ipLocation.subdivisions.-1"), None);
    }

    #[test]
    fn keeps_falsy_values_distinct_from_absence() {
        let data = json!({ "a": 0, "b": false, "c": "", "d": null });
        assert_eq!(resolve(Some(&data), "a"), Some(&json!(0)));
        assert_eq!(resolve(Some(&data), "b"), Some(&json!(false)));
        assert_eq!(resolve(Some(&data), "c"), Some(&json!("")));
        assert_eq!(resolve(Some(&data), "d"), Some(&Value::Null));
        assert_eq!(resolve(Some(&data), "d.e"), None);
    }

    #[test]
    fn never_fails_on_odd_roots_or_paths() {
        let scalars = [json!(null), json!(1), json!("text"), json!(true), json!([])];
        for root in &scalars {
            for path in ["", ".", "a", "a..b", "0", "..", "a.0.b"] {
                let _ = resolve(Some(root), path);
            }
        }
        assert_eq!(resolve(None, "visitorId"), None);
        assert_eq!(resolve(Some(&json!("text")), "length"), None);
        assert_eq!(resolve(Some(&json!({ "": 1 })), ""), Some(&json!(1)));
    }
}
