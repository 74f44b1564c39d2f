//! Terraform external data source bridge for the Cisco APIC REST API.
//!
//! One invocation reads a JSON request from stdin, logs in to the
//! controller, runs a single GET and writes one flat-string JSON envelope
//! to stdout. There is no retry, caching or shared state between runs.

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod protocol;
pub mod query;
pub mod redact;

use std::io::{Read, Write};

use anyhow::Context;
use serde_json::Value;
use tracing::{info, warn};

use config::{HttpConfig, QueryRequest};
use error::BridgeError;
use http_client::Transport;
use protocol::Response;
use redact::SecretRedactor;

/// Read stdin fully.
pub fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read standard input")?;
    Ok(buf)
}

/// Write the envelope as one line to stdout.
pub fn write_response(response: &Response) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(response.to_line().as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write standard output")
}

/// Handle one raw request and build the envelope.
///
/// `connect` builds the transport once the request has been validated, so
/// a rejected request never constructs one.
pub fn respond<T, F>(raw: &str, connect: F) -> Response
where
    T: Transport,
    F: FnOnce(&HttpConfig) -> T,
{
    let mut redactor = SecretRedactor::new();
    match execute(raw, connect, &mut redactor) {
        Ok(result) => {
            let response = Response::success(&result);
            info!(
                records = response.record_count.as_deref().unwrap_or("-"),
                "query succeeded"
            );
            response
        }
        Err(e) => {
            let message = e.render(&redactor);
            warn!(kind = e.kind(), error = %message, "query failed");
            Response::error(message)
        }
    }
}

fn execute<T, F>(raw: &str, connect: F, redactor: &mut SecretRedactor) -> Result<Value, BridgeError>
where
    T: Transport,
    F: FnOnce(&HttpConfig) -> T,
{
    let request = QueryRequest::parse(raw)?;
    redactor.add(&request.password);

    let transport = connect(&request.http_config());
    let session = auth::authenticate(
        &transport,
        &request.apic_url,
        &request.username,
        &request.password,
    )?;
    redactor.add(session.token());

    query::query(
        &session,
        &request.apic_url,
        &request.api_path,
        &request.query_params,
    )
}
