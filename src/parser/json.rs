use serde_json::Value;

use super::Record;
use crate::error::ImportError;

/// Turn a pulled JSON document into records.
///
/// Accepts a top-level array, an object whose first array-of-objects field
/// (in document order) holds the rows (`{"data": [...]}`, `{"events": [...]}`), or a single
/// object. Nested objects are flattened with `.`-joined keys.
pub fn records_from_json(value: &Value) -> Result<Vec<Record>, ImportError> {
    let rows: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let nested = map.values().find_map(|v| match v {
                Value::Array(items) if items.iter().any(Value::is_object) => Some(items),
                _ => None,
            });
            match nested {
                Some(items) => items.iter().collect(),
                None => vec![value],
            }
        }
        _ => {
            return Err(ImportError::Parse(
                "expected a JSON array or object in the API response".to_string(),
            ));
        }
    };

    Ok(rows
        .into_iter()
        .filter(|row| row.is_object())
        .map(|row| {
            let mut record = Record::new();
            flatten("", row, &mut record);
            record
        })
        .collect())
}

fn flatten(prefix: &str, value: &Value, out: &mut Record) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, out);
            }
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_array() {
        let records = records_from_json(&json!([
            { "id": 1, "name": "Jane", "address": { "district": "Bo" } },
            { "id": 2, "name": null },
            "not a row"
        ]))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id").map(String::as_str), Some("1"));
        assert_eq!(records[0].get("address.district").map(String::as_str), Some("Bo"));
        assert_eq!(records[1].get("name").map(String::as_str), Some(""));
    }

    #[test]
    fn test_wrapped_rows() {
        let records = records_from_json(&json!({
            "pager": { "page": 1 },
            "tags": ["a", "b"],
            "data": [{ "a": true }, { "a": false }]
        }))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("a").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_first_row_field_in_document_order() {
        let body = r#"{ "rows": [{ "id": "r1" }], "data": [{ "id": "d1" }, { "id": "d2" }] }"#;
        let value: Value = serde_json::from_str(body).unwrap();

        let records = records_from_json(&value).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id").map(String::as_str), Some("r1"));
    }

    #[test]
    fn test_single_object_and_scalars() {
        assert_eq!(records_from_json(&json!({ "x": 1 })).unwrap().len(), 1);
        assert!(matches!(records_from_json(&json!(42)), Err(ImportError::Parse(_))));
        assert!(records_from_json(&json!([])).unwrap().is_empty());
    }
}
