use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a JSON value as a timestamp: integers are Unix milliseconds, strings are RFC3339
pub fn parse_timestamp_value(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::Number(n) => {
            // Assume it's a Unix timestamp in milliseconds
            let ms = n.as_i64().ok_or_else(|| "invalid timestamp".to_string())?;
            DateTime::from_timestamp_millis(ms).ok_or_else(|| "timestamp out of range".to_string())
        }
        Value::String(s) => s
            .parse::<DateTime<Utc>>()
            .map_err(|e| format!("invalid RFC3339 timestamp: {}", e)),
        _ => Err("timestamp must be a number or string".to_string()),
    }
}

/// Custom deserializer for optional timestamps that accepts integers (ms), RFC3339 strings and null
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    parse_timestamp_value(&value).map(Some).map_err(Error::custom)
}
