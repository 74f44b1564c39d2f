//! Flat-string response envelope for Terraform's external data source.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

/// Emitted if the envelope itself fails to serialize.
pub const FALLBACK_ERROR: &str = r#"{"json_data":"{}","status":"error","error_message":"Unexpected error: failed to serialize response","timestamp":"0"}"#;

/// The single object written to stdout. Every value is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    /// Serialized query result, or `"{}"` on error.
    pub json_data: String,
    /// `"success"` or `"error"`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Unix seconds.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<String>,
}

impl Response {
    pub fn success(result: &Value) -> Self {
        Self {
            json_data: result.to_string(),
            status: "success".to_string(),
            error_message: None,
            timestamp: unix_timestamp(),
            record_count: record_count(result),
            total_count: result.get("totalCount").map(scalar_text),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            json_data: "{}".to_string(),
            status: "error".to_string(),
            error_message: Some(message),
            timestamp: unix_timestamp(),
            record_count: None,
            total_count: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Serialized envelope, newline-terminated.
    pub fn to_line(&self) -> String {
        let mut out = serde_json::to_string(self).unwrap_or_else(|_| FALLBACK_ERROR.to_string());
        out.push('\n');
        out
    }
}

fn record_count(result: &Value) -> Option<String> {
    match result.get("imdata")? {
        Value::Array(items) => Some(items.len().to_string()),
        Value::Object(map) => Some(map.len().to_string()),
        _ => None,
    }
}

/// Strings verbatim, anything else as JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_counts() {
        let result = json!({"imdata": [{"a": 1}, {"a": 2}], "totalCount": "2"});
        let resp = Response::success(&result);
        assert!(resp.is_success());
        assert_eq!(resp.record_count.as_deref(), Some("2"));
        assert_eq!(resp.total_count.as_deref(), Some("2"));
        assert_eq!(
            serde_json::from_str::<Value>(&resp.json_data).unwrap(),
            result
        );
    }

    #[test]
    fn test_success_without_metadata() {
        let resp = Response::success(&json!({"status": "ok"}));
        assert!(resp.record_count.is_none());
        assert!(resp.total_count.is_none());

        let line = resp.to_line();
        let out: Value = serde_json::from_str(line.trim_end()).unwrap();
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["json_data", "status", "timestamp"]);
    }

    #[test]
    fn test_total_count_rendering() {
        let resp = Response::success(&json!({"totalCount": 7, "imdata": []}));
        assert_eq!(resp.total_count.as_deref(), Some("7"));
        assert_eq!(resp.record_count.as_deref(), Some("0"));

        let resp = Response::success(&json!({"totalCount": null}));
        assert_eq!(resp.total_count.as_deref(), Some("null"));
    }

    #[test]
    fn test_imdata_non_array() {
        let resp = Response::success(&json!({"imdata": {"x": 1, "y": 2}}));
        assert_eq!(resp.record_count.as_deref(), Some("2"));

        let resp = Response::success(&json!({"imdata": 3}));
        assert!(resp.record_count.is_none());

        let resp = Response::success(&json!({"imdata": "abc"}));
        assert!(resp.is_success());
        assert!(resp.record_count.is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let resp = Response::error("API query failed: HTTP 500".to_string());
        let line = resp.to_line();
        assert!(line.ends_with('\n'));

        let out: Value = serde_json::from_str(line.trim_end()).unwrap();
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["json_data", "status", "error_message", "timestamp"]);
        assert_eq!(out["json_data"], "{}");
        assert_eq!(out["status"], "error");
        assert!(out["timestamp"].as_str().unwrap().parse::<u64>().unwrap() > 0);
    }

    #[test]
    fn test_fallback_is_valid_json() {
        let out: Value = serde_json::from_str(FALLBACK_ERROR).unwrap();
        assert_eq!(out["status"], "error");
    }
}
