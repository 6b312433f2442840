//! Messages sent by the extraction worker
//!
//! ## Wire Format: NDJSON (Newline-Delimited JSON)
//!
//! The worker writes one JSON object per line on its stdout. Each object is
//! classified by the first non-null distinguishing field, in this order:
//!
//! 1. `templateInfo` - `{ "templateInfo": { "version": "1.4.2", ... } }`
//! 2. `progress` - `{ "progress": <anything> }`
//! 3. `error` - `{ "error": { "message": "...", "stack": "...", "name": "..." } }`
//!
//! Anything else is [`WorkerMessage::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata describing a template artifact version.
///
/// Fields besides `version` are kept as-is so the cached JSON round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            extra: Map::new(),
        }
    }
}

/// Error reported by the worker before it exits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    pub message: String,
    #[serde(default = "default_error_name")]
    pub name: String,
    #[serde(default)]
    pub stack: String,
}

fn default_error_name() -> String {
    "Error".to_string()
}

/// A single message from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    TemplateInfo(TemplateInfo),
    Progress(Value),
    Error(WorkerError),
    Unknown(String),
}

impl WorkerMessage {
    /// Classify one line of worker output
    pub fn parse_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::Unknown(line.to_string()),
        }
    }

    pub fn from_value(value: Value) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Self::Unknown(other.to_string()),
        };

        if let Some(info) = take_present(&mut object, "templateInfo") {
            return match serde_json::from_value(info.clone()) {
                Ok(info) => Self::TemplateInfo(info),
                Err(_) => Self::unknown(restore(object, "templateInfo", info)),
            };
        }

        if let Some(progress) = take_present(&mut object, "progress") {
            return Self::Progress(progress);
        }

        if let Some(error) = take_present(&mut object, "error") {
            return match serde_json::from_value(error.clone()) {
                Ok(error) => Self::Error(error),
                Err(_) => Self::unknown(restore(object, "error", error)),
            };
        }

        Self::unknown(object)
    }

    fn unknown(object: Map<String, Value>) -> Self {
        Self::Unknown(Value::Object(object).to_string())
    }

    /// Serialize into the wire representation (without the trailing newline)
    pub fn to_line(&self) -> String {
        let value = match self {
            Self::TemplateInfo(info) => serde_json::json!({ "templateInfo": info }),
            Self::Progress(progress) => serde_json::json!({ "progress": progress }),
            Self::Error(error) => serde_json::json!({ "error": error }),
            Self::Unknown(raw) => return raw.clone(),
        };
        value.to_string()
    }
}

fn take_present(object: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match object.remove(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn restore(mut object: Map<String, Value>, key: &str, value: Value) -> Map<String, Value> {
    object.insert(key.to_string(), value);
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn parse_line_reads_template_info_and_keeps_extra_fields() {
        let message = WorkerMessage::parse_line(
            r#"{"templateInfo":{"version":"1.4.2","electronVersion":"30.0.0"}}"#,
        );

        let WorkerMessage::TemplateInfo(info) = message else {
            panic!("expected template info");
        };
        assert_eq!(info.version, "1.4.2");
        assert_eq!(info.extra.get("electronVersion"), Some(&json!("30.0.0")));
    }

    #[test]
    fn parse_line_reads_progress_verbatim() {
        let message =
            WorkerMessage::parse_line(r#"{"progress":{"percent":42,"desc":"Extracting"}}"#);

        assert_eq!(
            message,
            WorkerMessage::Progress(json!({"percent": 42, "desc": "Extracting"}))
        );
    }

    #[test]
    fn parse_line_reads_error_with_defaults() {
        let message = WorkerMessage::parse_line(r#"{"error":{"message":"disk full"}}"#);

        assert_eq!(
            message,
            WorkerMessage::Error(WorkerError {
                message: "disk full".to_string(),
                name: "Error".to_string(),
                stack: String::new(),
            })
        );
    }

    #[test]
    fn template_info_takes_priority_over_other_fields() {
        let message = WorkerMessage::from_value(json!({
            "progress": {"percent": 100},
            "error": {"message": "ignored"},
            "templateInfo": {"version": "2.0.0"}
        }));

        assert_eq!(message, WorkerMessage::TemplateInfo(TemplateInfo::new("2.0.0")));
    }

    #[test]
    fn progress_takes_priority_over_error() {
        let message = WorkerMessage::from_value(json!({
            "error": {"message": "ignored"},
            "progress": 10
        }));

        assert_eq!(message, WorkerMessage::Progress(json!(10)));
    }

    #[test]
    fn null_template_info_falls_through_to_progress() {
        let message = WorkerMessage::from_value(json!({
            "templateInfo": null,
            "progress": {"percent": 5}
        }));

        assert_eq!(message, WorkerMessage::Progress(json!({"percent": 5})));
    }

    #[rstest]
    #[case("not json at all")]
    #[case(r#""just a string""#)]
    #[case(r#"[1, 2, 3]"#)]
    #[case(r#"{"status":"downloading"}"#)]
    #[case(r#"{"progress":null}"#)]
    #[case(r#"{"templateInfo":{"name":"no version"}}"#)]
    #[case(r#"{"error":{"name":"NoMessage"}}"#)]
    fn parse_line_returns_unknown_for_unrecognized_shapes(#[case] line: &str) {
        assert!(matches!(
            WorkerMessage::parse_line(line),
            WorkerMessage::Unknown(_)
        ));
    }

    #[test]
    fn to_line_uses_wire_field_names() {
        let line = WorkerMessage::Error(WorkerError {
            message: "disk full".to_string(),
            name: "IOError".to_string(),
            stack: "at extract".to_string(),
        })
        .to_line();

        assert_eq!(
            serde_json::from_str::<Value>(&line).unwrap(),
            json!({"error": {"message": "disk full", "name": "IOError", "stack": "at extract"}})
        );
    }
}
