//! `aci-query`: Terraform external data source for the Cisco APIC REST API.
//!
//! Reads one JSON request on stdin and always writes exactly one JSON
//! envelope on stdout. Exit code 0 on success, 1 on any error.
//! Diagnostics go to stderr, filtered by `ACI_QUERY_LOG` (default `warn`).

use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use aci_query::error::BridgeError;
use aci_query::http_client::HttpClient;
use aci_query::protocol::Response;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ACI_QUERY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let response = match aci_query::read_stdin() {
        Ok(raw) => panic::catch_unwind(AssertUnwindSafe(|| {
            aci_query::respond(&raw, HttpClient::new)
        }))
        .unwrap_or_else(|payload| {
            let details = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal panic".to_string());
            Response::error(BridgeError::unexpected(details).to_string())
        }),
        Err(e) => Response::error(BridgeError::from(e).to_string()),
    };

    if let Err(e) = aci_query::write_response(&response) {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
