//! Turns the backend's grouped-or-flat report payloads into one row list.

use serde_json::Value;

use super::row::{GroupTag, ReportRow};

/// One value under a key of a grouped payload.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupEntry {
    /// `"expired": [ ... ]`
    List(Vec<Value>),
    /// `"2025-01": { "items": [ ... ], "label": "Jan 2025" }`
    Group { items: Vec<Value>, label: Option<String> },
}

/// The two shapes report endpoints return.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPayload {
    Flat(Vec<Value>),
    /// Keys in the order the backend sent them.
    Grouped(Vec<(String, GroupEntry)>),
}

/// How items drawn from a grouped payload are tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagging {
    /// Every group (list or object) tags its items with `groupKey`/`groupLabel`.
    GroupKey,
    /// Plain-array buckets tag with `sourceBucket`; group objects still
    /// tag with `groupKey`/`groupLabel`.
    SourceBucket,
}

impl GroupEntry {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => GroupEntry::List(items.clone()),
            Value::Object(map) => {
                let items = ["items", "list"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_array))
                    .cloned()
                    .unwrap_or_default();
                let label = map
                    .get("label")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                GroupEntry::Group { items, label }
            }
            other => {
                tracing::warn!(kind = json_kind(other), "ignoring non-collection group entry");
                GroupEntry::List(Vec::new())
            }
        }
    }
}

impl ReportPayload {
    /// Classify a raw `data` value. `null` and scalars become an empty flat
    /// payload instead of an error.
    pub fn from_value(data: &Value) -> Self {
        match data {
            Value::Array(items) => ReportPayload::Flat(items.clone()),
            Value::Object(map) => ReportPayload::Grouped(
                map.iter()
                    .map(|(k, v)| (k.clone(), GroupEntry::from_value(v)))
                    .collect(),
            ),
            Value::Null => ReportPayload::Flat(Vec::new()),
            other => {
                tracing::warn!(kind = json_kind(other), "unexpected report payload shape");
                ReportPayload::Flat(Vec::new())
            }
        }
    }
}

/// Flatten a payload into rows. Flat arrays come back in order with no
/// tagging; grouped payloads are walked key by key.
pub fn flatten(payload: &ReportPayload, tagging: Tagging) -> Vec<ReportRow> {
    match payload {
        ReportPayload::Flat(items) => items
            .iter()
            .map(|item| ReportRow::from_value(item, None))
            .collect(),
        ReportPayload::Grouped(groups) => {
            let mut rows = Vec::new();
            for (key, entry) in groups {
                let (items, tag) = match (entry, tagging) {
                    (GroupEntry::List(items), Tagging::SourceBucket) => {
                        (items, GroupTag::Bucket(key.clone()))
                    }
                    (GroupEntry::List(items), Tagging::GroupKey) => (
                        items,
                        GroupTag::Group {
                            key: key.clone(),
                            label: None,
                        },
                    ),
                    (GroupEntry::Group { items, label }, _) => (
                        items,
                        GroupTag::Group {
                            key: key.clone(),
                            label: label.clone(),
                        },
                    ),
                };
                rows.extend(items.iter().map(|item| ReportRow::from_value(item, Some(&tag))));
            }
            rows
        }
    }
}

/// `from_value` + `flatten` in one call.
pub fn flatten_value(data: &Value, tagging: Tagging) -> Vec<ReportRow> {
    flatten(&ReportPayload::from_value(data), tagging)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_empty() {
        assert!(flatten_value(&Value::Null, Tagging::GroupKey).is_empty());
        assert!(flatten_value(&json!("oops"), Tagging::SourceBucket).is_empty());
    }

    #[test]
    fn test_flat_array_keeps_items_and_order() {
        let data = json!([
            {"customerName": "B", "groupKey": "kept"},
            {"customerName": "A"},
            {"customerName": "C"}
        ]);
        let rows = flatten_value(&data, Tagging::GroupKey);
        let names: Vec<_> = rows.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, ["B", "A", "C"]);
        assert_eq!(rows[0].raw, data[0].as_object().unwrap().clone());
        assert_eq!(rows[0].group_key.as_deref(), Some("kept"));
        assert_eq!(rows[1].group_key, None);
        assert_eq!(rows[1].source_bucket, None);
    }

    #[test]
    fn test_grouped_object_tags_key_and_label() {
        let data = json!({
            "2025-01": {
                "items": [{"customerName": "a", "productId": "P1"}, {"customerName": "b"}],
                "label": "Jan 2025"
            }
        });
        let rows = flatten_value(&data, Tagging::GroupKey);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.group_key.as_deref(), Some("2025-01"));
            assert_eq!(row.group_label.as_deref(), Some("Jan 2025"));
        }
        assert_eq!(rows[0].raw["productId"], json!("P1"));
        assert_eq!(rows[1].customer_name, "b");
    }

    #[test]
    fn test_list_field_and_key_order() {
        let data = json!({
            "2025-03": {"list": [{"customerName": "march"}]},
            "2025-01": {"items": [{"customerName": "jan"}], "list": [{"customerName": "ignored"}]},
            "2025-02": {"label": "empty"}
        });
        let rows = flatten_value(&data, Tagging::GroupKey);
        let names: Vec<_> = rows.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, ["march", "jan"]);
    }

    #[test]
    fn test_bucket_arrays_tag_source_bucket() {
        let data = json!({
            "expired": [{"customerName": "x"}],
            "2025-05": {"items": [{"customerName": "y"}], "label": "May"}
        });

        let rows = flatten_value(&data, Tagging::SourceBucket);
        assert_eq!(rows[0].source_bucket.as_deref(), Some("expired"));
        assert_eq!(rows[0].group_key, None);
        assert_eq!(rows[1].group_key.as_deref(), Some("2025-05"));
        assert_eq!(rows[1].source_bucket, None);

        let rows = flatten_value(&data, Tagging::GroupKey);
        assert_eq!(rows[0].group_key.as_deref(), Some("expired"));
        assert_eq!(rows[0].source_bucket, None);
    }

    #[test]
    fn test_input_is_untouched() {
        let data = json!({"k": {"items": [{"customerName": "a"}]}});
        let before = data.clone();
        let _ = flatten_value(&data, Tagging::SourceBucket);
        assert_eq!(data, before);
    }
}
