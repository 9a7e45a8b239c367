use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Where a flattened row came from inside a grouped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTag {
    /// Keyed group, e.g. `"2025-01": { items, label }`
    Group { key: String, label: Option<String> },
    /// Plain array stored under a bucket name, e.g. `"expired": [...]`
    Bucket(String),
}

/// One normalized report line.
///
/// Every field is populated (missing source values become empty strings,
/// `0.0` or `None`) so filtering and sorting never deal with absent data.
/// The original object is kept in `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub customer_name: String,
    pub product_id: String,
    pub description: String,
    pub license_type: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub total_price: f64,
    pub group_key: Option<String>,
    pub group_label: Option<String>,
    pub source_bucket: Option<String>,
    pub raw: Map<String, Value>,
}

const CUSTOMER_FIELDS: &[&str] = &["customerName", "customer_name", "customer", "companyName"];
const PRODUCT_FIELDS: &[&str] = &["productId", "product_id", "productCode"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "productName", "product_name"];
const LICENSE_TYPE_FIELDS: &[&str] = &["licenseType", "license_type"];
const EXPIRY_FIELDS: &[&str] = &["expiryDate", "expiry", "licenseExpiryDate"];
const PRICE_FIELDS: &[&str] = &["totalPrice", "total"];

impl ReportRow {
    /// Build a row from one payload item. Non-object items produce an
    /// all-default row rather than an error.
    pub fn from_value(value: &Value, tag: Option<&GroupTag>) -> Self {
        let raw = match value {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        let (mut group_key, mut group_label, mut source_bucket) = (
            opt_string(&raw, "groupKey"),
            opt_string(&raw, "groupLabel"),
            opt_string(&raw, "sourceBucket"),
        );
        match tag {
            Some(GroupTag::Group { key, label }) => {
                group_key = Some(key.clone());
                group_label = label.clone();
            }
            Some(GroupTag::Bucket(name)) => source_bucket = Some(name.clone()),
            None => {}
        }

        Self {
            customer_name: first_string(&raw, CUSTOMER_FIELDS),
            product_id: first_string(&raw, PRODUCT_FIELDS),
            description: first_string(&raw, DESCRIPTION_FIELDS),
            license_type: first_string(&raw, LICENSE_TYPE_FIELDS),
            expiry_date: first_present(&raw, EXPIRY_FIELDS).and_then(parse_timestamp),
            total_price: first_present(&raw, PRICE_FIELDS)
                .map(coerce_number)
                .unwrap_or(0.0),
            group_key,
            group_label,
            source_bucket,
            raw,
        }
    }

    /// Expiry as epoch milliseconds; absent or unparseable dates sort as 0.
    pub fn expiry_timestamp(&self) -> i64 {
        self.expiry_date.map_or(0, |d| d.timestamp_millis())
    }

    pub fn expiry_day(&self) -> Option<NaiveDate> {
        self.expiry_date.map(|d| d.date_naive())
    }

    /// Human name of the bucket this row was drawn from, if any.
    pub fn group_display(&self) -> &str {
        self.group_label
            .as_deref()
            .or(self.group_key.as_deref())
            .or(self.source_bucket.as_deref())
            .unwrap_or("")
    }
}

fn first_present<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .find(|v| !v.is_null())
}

fn first_string(raw: &Map<String, Value>, keys: &[&str]) -> String {
    first_present(raw, keys).map(coerce_string).unwrap_or_default()
}

fn opt_string(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).filter(|v| !v.is_null()).map(coerce_string)
}

/// String coercion: numbers and booleans are printed, objects use their
/// `name` field, everything else becomes empty.
pub(crate) fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => map.get("name").map(coerce_string).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Numeric coercion; anything non-numeric or non-finite becomes 0.
pub(crate) fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS[.f]` and
/// epoch milliseconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let row = ReportRow::from_value(&json!({}), None);
        assert_eq!(row.customer_name, "");
        assert_eq!(row.total_price, 0.0);
        assert_eq!(row.expiry_timestamp(), 0);
        assert_eq!(row.group_display(), "");
    }

    #[test]
    fn test_expiry_uses_first_non_null_field() {
        let row = ReportRow::from_value(
            &json!({"expiryDate": null, "expiry": "2025-03-01", "licenseExpiryDate": "2030-01-01"}),
            None,
        );
        assert_eq!(row.expiry_day(), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_unparseable_expiry_is_zero() {
        let row = ReportRow::from_value(&json!({"expiryDate": "soon", "expiry": "2025-03-01"}), None);
        assert_eq!(row.expiry_date, None);
        assert_eq!(row.expiry_timestamp(), 0);
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp(&json!("2025-01-15T10:00:00Z")).is_some());
        assert!(parse_timestamp(&json!("2025-01-15T10:00:00.123")).is_some());
        assert_eq!(
            parse_timestamp(&json!(86_400_000)).map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(1970, 1, 2)
        );
    }

    #[test]
    fn test_price_coercion() {
        assert_eq!(ReportRow::from_value(&json!({"totalPrice": "1,250.50"}), None).total_price, 1250.5);
        assert_eq!(ReportRow::from_value(&json!({"total": 42}), None).total_price, 42.0);
        assert_eq!(ReportRow::from_value(&json!({"totalPrice": "n/a"}), None).total_price, 0.0);
    }

    #[test]
    fn test_customer_object_and_number_coercion() {
        let row = ReportRow::from_value(&json!({"customer": {"name": "Acme"}, "productId": 77}), None);
        assert_eq!(row.customer_name, "Acme");
        assert_eq!(row.product_id, "77");
    }

    #[test]
    fn test_tag_overrides_raw_group_fields() {
        let tag = GroupTag::Group { key: "2025-01".into(), label: Some("Jan 2025".into()) };
        let row = ReportRow::from_value(&json!({"groupKey": "old"}), Some(&tag));
        assert_eq!(row.group_key.as_deref(), Some("2025-01"));
        assert_eq!(row.group_display(), "Jan 2025");
        assert_eq!(row.raw["groupKey"], json!("old"));
    }
}
