//! Error taxonomy for a single bridge invocation.
//!
//! Every variant renders to the exact `error_message` text placed in the
//! error envelope, so the `Display` impl is part of the output contract.
//! Stage prefixes are kept apart from the details so that only the details
//! go through secret redaction.

use thiserror::Error;

use crate::redact::SecretRedactor;

/// Any failure that ends an invocation.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A required input field is absent or null. Detected before any I/O.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Standard input is not a JSON object.
    #[error("Invalid input JSON: {0}")]
    InputParse(String),

    /// Login failed: transport error, bad status, bad body or no token.
    #[error("{prefix}{details}")]
    Auth { prefix: &'static str, details: String },

    /// The data query failed: transport error, bad status or bad body.
    #[error("{prefix}{details}")]
    Query { prefix: &'static str, details: String },

    /// Anything else, with the underlying description preserved.
    #[error("Unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn auth_request(details: impl std::fmt::Display) -> Self {
        Self::Auth {
            prefix: "Authentication request failed: ",
            details: details.to_string(),
        }
    }

    pub fn auth_invalid_json(details: impl std::fmt::Display) -> Self {
        Self::Auth {
            prefix: "Invalid JSON response during authentication: ",
            details: details.to_string(),
        }
    }

    pub fn no_token() -> Self {
        Self::Auth {
            prefix: "Authentication failed - no token received",
            details: String::new(),
        }
    }

    pub fn query_request(details: impl std::fmt::Display) -> Self {
        Self::Query {
            prefix: "API query failed: ",
            details: details.to_string(),
        }
    }

    pub fn query_invalid_json(details: impl std::fmt::Display) -> Self {
        Self::Query {
            prefix: "Invalid JSON response from API: ",
            details: details.to_string(),
        }
    }

    pub fn unexpected(details: impl std::fmt::Display) -> Self {
        Self::Unexpected(anyhow::anyhow!("{details}"))
    }

    /// Short tag for log records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "missing_parameter",
            Self::InputParse(_) => "input_parse",
            Self::Auth { .. } => "auth",
            Self::Query { .. } => "query",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// The envelope `error_message`, with secrets scrubbed from the details
    /// only. The stage prefix is always emitted verbatim.
    pub fn render(&self, redactor: &SecretRedactor) -> String {
        match self {
            Self::MissingParameter(_) => self.to_string(),
            Self::InputParse(details) => {
                format!("Invalid input JSON: {}", redactor.redact(details))
            }
            Self::Auth { prefix, details } | Self::Query { prefix, details } => {
                format!("{prefix}{}", redactor.redact(details))
            }
            Self::Unexpected(e) => {
                format!("Unexpected error: {}", redactor.redact(&format!("{e:#}")))
            }
        }
    }
}
