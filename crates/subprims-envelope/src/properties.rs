use std::collections::BTreeMap;

use serde_json::{Map, Value};
use subprims_broker::RawProperties;

/// Normalized message properties.
pub type PropertyMap = BTreeMap<String, String>;

/// Normalize broker properties into a plain string map.
///
/// Absent properties become an empty map. In the pair-list form a repeated
/// key keeps its last value.
pub fn normalize_properties(raw: Option<&RawProperties>) -> PropertyMap {
    match raw {
        None => PropertyMap::new(),
        Some(RawProperties::Map(map)) => map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Some(RawProperties::Pairs(pairs)) => pairs.iter().cloned().collect(),
    }
}

/// Properties as a JSON object of strings, the form schemas validate.
pub fn properties_to_value(properties: &PropertyMap) -> Value {
    let object: Map<String, Value> = properties
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn absent_properties_normalize_to_empty_map() {
        assert!(normalize_properties(None).is_empty());
    }

    #[test]
    fn pair_list_matches_equivalent_map() {
        let items = [("tenant", "acme"), ("region", "eu"), ("trace", "t-1")];
        let from_pairs = normalize_properties(Some(&RawProperties::Pairs(pairs(&items))));
        let from_map = normalize_properties(Some(&RawProperties::Map(
            pairs(&items).into_iter().collect::<HashMap<_, _>>(),
        )));

        assert_eq!(from_pairs, from_map);
        assert_eq!(from_pairs.get("region").map(String::as_str), Some("eu"));
    }

    #[test]
    fn repeated_pair_key_keeps_last_value() {
        let raw = RawProperties::Pairs(pairs(&[("k", "first"), ("k", "second")]));
        let normalized = normalize_properties(Some(&raw));

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["k"], "second");
    }

    #[test]
    fn properties_render_as_string_object() {
        let raw = RawProperties::Pairs(pairs(&[("b", "2"), ("a", "1")]));
        let value = properties_to_value(&normalize_properties(Some(&raw)));
        assert_eq!(value, json!({"a": "1", "b": "2"}));
        assert_eq!(properties_to_value(&PropertyMap::new()), json!({}));
    }
}
