//! Blocking HTTP transport for talking to the controller.
//!
//! The stages only see the [`Transport`] trait, so tests can swap in a
//! recording mock. Non-2xx statuses come back as data; deciding whether a
//! status is a failure belongs to the caller.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::config::HttpConfig;

/// A response with its status and the body read as text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// One-line description of a failed status.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            format!("HTTP {} for url: {}", self.status, self.url)
        } else {
            format!("HTTP {} {} for url: {}", self.status, self.reason, self.url)
        }
    }
}

/// Errors below the HTTP status level.
#[derive(Debug)]
pub enum TransportError {
    /// Connection, TLS, DNS or timeout failure.
    Request(String),
    /// Body could not be read or exceeded the size limit.
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "{e}"),
            Self::Body(e) => write!(f, "failed to read response body: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The two calls a session needs.
pub trait Transport {
    /// POST `body` as `application/json`.
    fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;

    /// GET `url` (query string already applied).
    fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        (**self).post_json(url, body, headers)
    }

    fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        (**self).get(url, headers)
    }
}

/// `ureq`-backed transport built from one [`HttpConfig`].
pub struct HttpClient {
    agent: ureq::Agent,
    max_response_bytes: u64,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!config.verify_certificates)
            .build();
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_global(Some(config.timeout))
                .http_status_as_error(false)
                .user_agent(config.user_agent.as_str())
                .tls_config(tls)
                .build(),
        );
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }

    fn finish(
        &self,
        url: &Url,
        response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<HttpResponse, TransportError> {
        let response = response.map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .into_body()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_string()
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url: url.to_string(),
            body,
        })
    }
}

impl Transport for HttpClient {
    fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| TransportError::Request(e.to_string()))?;
        let mut req = self.agent.post(url.as_str());
        for (key, value) in headers {
            req = req.header(key, value);
        }
        let response = req.content_type("application/json").send(&payload[..]);
        self.finish(url, response)
    }

    fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        let mut req = self.agent.get(url.as_str());
        for (key, value) in headers {
            req = req.header(key, value);
        }
        let response = req.call();
        self.finish(url, response)
    }
}
