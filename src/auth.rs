//! APIC session login.
//!
//! One POST to `/api/aaaLogin.json`; the token from the reply is carried
//! on later calls as the `APIC-cookie` cookie.

use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::BridgeError;
use crate::http_client::Transport;

/// Login endpoint, resolved against the controller base URL.
pub const LOGIN_PATH: &str = "/api/aaaLogin.json";

/// An authenticated session. Lives for one invocation only.
pub struct Session<'t, T: Transport> {
    transport: &'t T,
    token: String,
}

impl<'t, T: Transport> Session<'t, T> {
    pub fn transport(&self) -> &'t T {
        self.transport
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Headers attached to every call made with this session.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![("Cookie".to_string(), format!("APIC-cookie={}", self.token))]
    }
}

/// Login payload in the controller's `aaaUser` envelope.
fn login_payload(username: &str, password: &str) -> Value {
    json!({
        "aaaUser": {
            "attributes": {
                "name": username,
                "pwd": password,
            }
        }
    })
}

/// Pull `imdata[0].aaaLogin.attributes.token` out of a login reply.
fn extract_token(body: &Value) -> Option<&str> {
    body.get("imdata")?
        .as_array()?
        .first()?
        .get("aaaLogin")?
        .get("attributes")?
        .get("token")?
        .as_str()
        .filter(|t| !t.is_empty())
}

/// Exchange credentials for a session token.
pub fn authenticate<'t, T: Transport>(
    transport: &'t T,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<Session<'t, T>, BridgeError> {
    let login_url = Url::parse(base_url)
        .and_then(|base| base.join(LOGIN_PATH))
        .map_err(|e| BridgeError::auth_request(format!("invalid URL '{base_url}': {e}")))?;

    debug!(url = %login_url, user = username, "logging in");

    let response = transport
        .post_json(&login_url, &login_payload(username, password), &[])
        .map_err(BridgeError::auth_request)?;
    if !response.is_success() {
        return Err(BridgeError::auth_request(response.status_line()));
    }

    let body: Value =
        serde_json::from_str(&response.body).map_err(BridgeError::auth_invalid_json)?;
    let token = extract_token(&body).ok_or_else(BridgeError::no_token)?;

    info!(user = username, "session established");
    Ok(Session {
        transport,
        token: token.to_string(),
    })
}
