//! Invocation request parsing and per-session transport settings.
//!
//! The request arrives as one JSON object on stdin. Terraform's external
//! data source passes every value as a string, so optional numeric and map
//! fields are accepted in either native or string-encoded form.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Default timeout for each HTTP call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on the per-call timeout (one day). Larger values overflow
/// deadline arithmetic in the HTTP client.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Maximum response body size in bytes (10 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

/// Required keys, in the order they are checked.
const REQUIRED: [&str; 4] = ["apic_url", "username", "password", "api_path"];

/// A parsed invocation request.
pub struct QueryRequest {
    /// Controller base URL with trailing slashes removed.
    pub apic_url: String,
    pub username: String,
    pub password: String,
    /// API path exactly as given by the caller (normalized later).
    pub api_path: String,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Query parameters in caller order.
    pub query_params: Vec<(String, String)>,
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("apic_url", &self.apic_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_path", &self.api_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("query_params", &self.query_params)
            .finish()
    }
}

impl QueryRequest {
    /// Parse raw stdin text into a request.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| BridgeError::InputParse(e.to_string()))?;
        let Value::Object(input) = value else {
            return Err(BridgeError::InputParse("expected a JSON object".to_string()));
        };
        Self::from_object(&input)
    }

    fn from_object(input: &Map<String, Value>) -> Result<Self, BridgeError> {
        // Presence of every required key is checked before any type checks.
        for key in REQUIRED {
            if input.get(key).map_or(true, Value::is_null) {
                return Err(BridgeError::MissingParameter(key));
            }
        }

        let apic_url = required_str(input, "apic_url")?.trim_end_matches('/').to_string();

        Ok(Self {
            apic_url,
            username: required_str(input, "username")?.to_string(),
            password: required_str(input, "password")?.to_string(),
            api_path: required_str(input, "api_path")?.to_string(),
            timeout_secs: parse_timeout(input.get("timeout"))?,
            query_params: parse_query_params(input.get("query_params"))?,
        })
    }

    /// Transport settings derived from this request.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::for_timeout(self.timeout_secs)
    }
}

fn required_str<'a>(input: &'a Map<String, Value>, key: &str) -> Result<&'a str, BridgeError> {
    match input.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(BridgeError::unexpected(format!(
            "parameter '{key}' must be a string, got {}",
            type_name(other)
        ))),
        None => Err(BridgeError::unexpected(format!("parameter '{key}' is missing"))),
    }
}

fn parse_timeout(value: Option<&Value>) -> Result<u64, BridgeError> {
    let secs = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_TIMEOUT_SECS),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match secs {
        Some(s) if s > 0 => Ok((s as u64).min(MAX_TIMEOUT_SECS)),
        _ => Err(BridgeError::unexpected(format!(
            "invalid timeout {}: expected a positive number of seconds",
            value.map(Value::to_string).unwrap_or_default()
        ))),
    }
}

fn parse_query_params(value: Option<&Value>) -> Result<Vec<(String, String)>, BridgeError> {
    let decoded;
    let map = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(s)) => {
            decoded = serde_json::from_str::<Value>(s).map_err(|e| {
                BridgeError::unexpected(format!("query_params is not a JSON object: {e}"))
            })?;
            match &decoded {
                Value::Object(m) => m,
                other => {
                    return Err(BridgeError::unexpected(format!(
                        "query_params must be an object, got {}",
                        type_name(other)
                    )))
                }
            }
        }
        Some(Value::Object(m)) => m,
        Some(other) => {
            return Err(BridgeError::unexpected(format!(
                "query_params must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let mut params = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = scalar_param(key, item)? {
                        params.push((key.clone(), v));
                    }
                }
            }
            other => {
                if let Some(v) = scalar_param(key, other)? {
                    params.push((key.clone(), v));
                }
            }
        }
    }
    Ok(params)
}

/// Render a single query parameter value. `null` values are dropped.
fn scalar_param(key: &str, value: &Value) -> Result<Option<String>, BridgeError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(BridgeError::unexpected(format!(
            "query parameter '{key}' must be a scalar or a list of scalars, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Transport settings for one session.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Applied to every call made by the session.
    pub timeout: Duration,
    /// Controllers commonly serve self-signed certificates, so this is off.
    pub verify_certificates: bool,
    /// Maximum response body size in bytes.
    pub max_response_bytes: u64,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn for_timeout(secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(secs.min(MAX_TIMEOUT_SECS)),
            ..Self::default()
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_certificates: false,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("aci-query/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
