//! Accessors for schemaless record values.
//!
//! Records are plain JSON objects in local form. The engine only ever looks
//! at two fields: the unique identifier and the last-update timestamp.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Field carrying the unique record identifier.
pub const ID_FIELD: &str = "id";

/// Field carrying the last-update timestamp (ISO-8601 string, local form).
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// The record's identifier, if present and a string.
pub fn id_of(record: &Value) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

/// The record's update timestamp.
///
/// A missing, non-string, or unparseable timestamp is treated as the Unix
/// epoch, so untimestamped records always lose a merge against timestamped
/// ones.
pub fn updated_at(record: &Value) -> DateTime<Utc> {
    record
        .get(UPDATED_AT_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// A copy of the record with its update timestamp set to `now`.
///
/// Non-object records are returned unchanged.
pub fn stamp_updated_at(record: &Value, now: DateTime<Utc>) -> Value {
    let mut stamped = record.clone();
    if let Some(map) = stamped.as_object_mut() {
        map.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    stamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_extraction() {
        assert_eq!(id_of(&json!({"id": "s1", "name": "Alice"})), Some("s1"));
        assert_eq!(id_of(&json!({"name": "Alice"})), None);
        assert_eq!(id_of(&json!({"id": 42})), None);
        assert_eq!(id_of(&json!("not an object")), None);
    }

    #[test]
    fn timestamp_parsing() {
        let record = json!({"id": "s1", "updatedAt": "2024-01-02T03:04:05.000Z"});
        let parsed = updated_at(&record);
        assert_eq!(
            parsed.to_rfc3339_opts(SecondsFormat::Millis, true),
            "2024-01-02T03:04:05.000Z"
        );
    }

    #[test]
    fn timestamp_with_offset() {
        let record = json!({"id": "s1", "updatedAt": "2024-01-02T03:04:05+08:00"});
        assert_eq!(
            updated_at(&record).to_rfc3339_opts(SecondsFormat::Secs, true),
            "2024-01-01T19:04:05Z"
        );
    }

    #[test]
    fn missing_or_bad_timestamp_is_epoch() {
        assert_eq!(updated_at(&json!({"id": "s1"})), DateTime::UNIX_EPOCH);
        assert_eq!(
            updated_at(&json!({"id": "s1", "updatedAt": "yesterday"})),
            DateTime::UNIX_EPOCH
        );
        assert_eq!(
            updated_at(&json!({"id": "s1", "updatedAt": 1700000000})),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn stamping_overwrites() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = json!({"id": "s1", "updatedAt": "2020-01-01T00:00:00Z"});
        let stamped = stamp_updated_at(&record, now);
        assert_eq!(stamped["updatedAt"], "2024-06-01T12:00:00.000Z");
        assert_eq!(stamped["id"], "s1");
        // original untouched
        assert_eq!(record["updatedAt"], "2020-01-01T00:00:00Z");
    }
}
