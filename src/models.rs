//! Log record types shared by ingestion, storage and the HTTP surface

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Width every stored timestamp is padded to, so string order stays time order
pub const TIMESTAMP_WIDTH: usize = 20;

/// Character used to right-pad short timestamps
pub const TIMESTAMP_FILLER: char = '_';

/// Message envelope as published on the bus
///
/// `from`, `caller` and `save` are accepted as aliases for publishers that
/// still use the older field names. A message must use one spelling per
/// field: carrying both `source` and `from` (or `callerData` and `caller`,
/// or `persist` and `save`) is a duplicate-field error and the message is
/// rejected as malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(alias = "from")]
    pub source: String,
    pub payload: String,
    pub level: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "callerData", alias = "caller")]
    pub caller_data: Option<Value>,
    #[serde(default, alias = "save")]
    pub persist: Option<bool>,
}

impl IncomingMessage {
    /// Parse a raw bus payload
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Whether the record should be written to storage (absent means yes)
    pub fn should_persist(&self) -> bool {
        self.persist != Some(false)
    }

    /// Build the normalized record that is stored and broadcast
    pub fn into_record(self) -> LogRecord {
        LogRecord {
            id: None,
            source: self.source,
            payload: self.payload,
            level: self.level,
            timestamp: normalize_timestamp(self.timestamp, current_timestamp),
            caller_data: self.caller_data,
            extra_data: None,
        }
    }
}

/// One log line, either in flight or read back from its topic table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Assigned by storage on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub payload: String,
    pub level: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
}

/// Event pushed to live observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub topic: String,
    pub message: LogRecord,
}

/// Pad short timestamps to [`TIMESTAMP_WIDTH`] and fill in missing ones
///
/// Empty strings count as missing. Timestamps already at or beyond the width are
/// kept as-is.
pub fn normalize_timestamp(timestamp: Option<String>, now: impl FnOnce() -> String) -> String {
    match timestamp {
        Some(ts) if !ts.is_empty() => {
            let len = ts.chars().count();
            if len >= TIMESTAMP_WIDTH {
                ts
            } else {
                let mut padded = ts;
                padded.extend(std::iter::repeat(TIMESTAMP_FILLER).take(TIMESTAMP_WIDTH - len));
                padded
            }
        }
        _ => now(),
    }
}

/// Current UTC time in ISO-8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_timestamp_is_padded() {
        let ts = normalize_timestamp(Some("2024".to_string()), || unreachable!());
        assert_eq!(ts, "2024________________");
        assert_eq!(ts.len(), TIMESTAMP_WIDTH);
    }

    #[test]
    fn test_full_width_timestamp_is_unchanged() {
        let exact = "2024-05-01T12:00:00Z";
        assert_eq!(exact.len(), 20);
        assert_eq!(normalize_timestamp(Some(exact.to_string()), || unreachable!()), exact);

        let longer = "2024-05-01T12:00:00.123Z";
        assert_eq!(normalize_timestamp(Some(longer.to_string()), || unreachable!()), longer);
    }

    #[test]
    fn test_missing_or_empty_timestamp_is_generated() {
        assert_eq!(normalize_timestamp(None, || "now".to_string()), "now");
        assert_eq!(normalize_timestamp(Some(String::new()), || "now".to_string()), "now");
    }

    #[test]
    fn test_current_timestamp_is_iso8601() {
        let ts = current_timestamp();
        assert!(ts.len() >= TIMESTAMP_WIDTH);
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_parse_incoming_message() {
        let raw = br#"{"source":"svc1","payload":"disk full","level":"error","callerData":{"line":12}}"#;
        let msg = IncomingMessage::from_slice(raw).unwrap();
        assert_eq!(msg.source, "svc1");
        assert!(msg.should_persist());
        assert_eq!(msg.caller_data, Some(serde_json::json!({"line": 12})));

        let record = msg.into_record();
        assert_eq!(record.id, None);
        assert!(record.timestamp.len() >= TIMESTAMP_WIDTH);
    }

    #[test]
    fn test_parse_legacy_field_names() {
        let raw = br#"{"from":"svc2","payload":"p","level":"info","caller":"main.rs","save":false}"#;
        let msg = IncomingMessage::from_slice(raw).unwrap();
        assert_eq!(msg.source, "svc2");
        assert_eq!(msg.caller_data, Some(serde_json::json!("main.rs")));
        assert!(!msg.should_persist());
    }

    #[test]
    fn test_both_spellings_of_a_field_fail() {
        for raw in [
            br#"{"source":"a","from":"b","payload":"p","level":"info"}"#.as_slice(),
            br#"{"source":"a","payload":"p","level":"info","callerData":1,"caller":2}"#,
            br#"{"source":"a","payload":"p","level":"info","persist":true,"save":false}"#,
        ] {
            let err = IncomingMessage::from_slice(raw).unwrap_err();
            assert!(err.to_string().contains("duplicate field"), "{}", err);
        }
    }

    #[test]
    fn test_missing_required_field_fails() {
        let raw = br#"{"source":"svc1","level":"error"}"#;
        assert!(IncomingMessage::from_slice(raw).is_err());
        assert!(IncomingMessage::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = LogRecord {
            id: Some(7),
            source: "svc".to_string(),
            payload: "p".to_string(),
            level: "warn".to_string(),
            timestamp: "2024________________".to_string(),
            caller_data: Some(serde_json::json!({"fn": "main"})),
            extra_data: None,
        };
        let value = serde_json::to_value(LiveEvent {
            topic: "alerts".to_string(),
            message: record,
        })
        .unwrap();

        assert_eq!(value["topic"], "alerts");
        assert_eq!(value["message"]["id"], 7);
        assert_eq!(value["message"]["callerData"]["fn"], "main");
        assert!(value["message"].get("extraData").is_none());
    }
}
