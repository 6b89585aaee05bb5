use serde_json::{Map, Value};

pub mod checksum;
pub mod version;

pub use checksum::compute_checksum;
pub use version::{compare_versions, Version, VersionError};

/// Sets `key` to `value` unless the value is absent or empty.
pub fn set_string_value(values: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        values.insert(key.to_string(), value.into());
    }
}

pub fn is_empty_string(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn set_string_value_skips_empty_values() {
        let mut values = Map::new();
        set_string_value(&mut values, "a", Some("x"));
        set_string_value(&mut values, "b", Some(""));
        set_string_value(&mut values, "c", None);
        assert_eq!(json!({"a": "x"}), Value::Object(values));
    }

    #[test]
    fn empty_strings() {
        assert!(is_empty_string(None));
        assert!(is_empty_string(Some("")));
        assert!(!is_empty_string(Some("id")));
    }
}
