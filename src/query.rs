//! Authenticated GET against the controller API namespace.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Session;
use crate::error::BridgeError;
use crate::http_client::Transport;

/// Force `path` under `/api`.
///
/// Paths already starting with `/api` are left alone; note this is a plain
/// prefix check, so `/apiary` is also left alone.
pub fn normalize_api_path(path: &str) -> String {
    if path.starts_with("/api") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("/api{path}")
    } else {
        format!("/api/{path}")
    }
}

/// Resolve `api_path` against `base_url` and append `params`.
pub fn build_query_url(
    base_url: &str,
    api_path: &str,
    params: &[(String, String)],
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(&normalize_api_path(api_path))?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

/// Run one GET with the session and return the parsed body unmodified.
pub fn query<T: Transport>(
    session: &Session<'_, T>,
    base_url: &str,
    api_path: &str,
    params: &[(String, String)],
) -> Result<Value, BridgeError> {
    let url = build_query_url(base_url, api_path, params)
        .map_err(|e| BridgeError::query_request(format!("invalid URL: {e}")))?;

    debug!(url = %url, "querying");

    let mut headers = session.headers();
    headers.push(("Accept".to_string(), "application/json".to_string()));

    let response = session
        .transport()
        .get(&url, &headers)
        .map_err(BridgeError::query_request)?;
    if !response.is_success() {
        return Err(BridgeError::query_request(response.status_line()));
    }

    serde_json::from_str(&response.body).map_err(BridgeError::query_invalid_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use crate::http_client::mock::MockTransport;

    const LOGIN_OK: &str = r#"{"imdata":[{"aaaLogin":{"attributes":{"token":"tok-9"}}}]}"#;
    const BASE: &str = "https://apic.example.com";

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_api_path() {
        assert_eq!(normalize_api_path("foo/bar"), "/api/foo/bar");
        assert_eq!(normalize_api_path("/foo/bar"), "/api/foo/bar");
        assert_eq!(normalize_api_path("/api/foo"), "/api/foo");
        assert_eq!(normalize_api_path("api/foo"), "/api/api/foo");
        assert_eq!(normalize_api_path(""), "/api/");
    }

    #[test]
    fn test_build_query_url() {
        let url = build_query_url(BASE, "class/fvTenant.json", &[]).unwrap();
        assert_eq!(url.as_str(), "https://apic.example.com/api/class/fvTenant.json");

        let url = build_query_url(
            BASE,
            "/mo/uni/tn-common.json",
            &params(&[("query-target", "children"), ("target-subtree-class", "fvBD")]),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://apic.example.com/api/mo/uni/tn-common.json?query-target=children&target-subtree-class=fvBD"
        );
    }

    #[test]
    fn test_params_appended_to_existing_query() {
        let url = build_query_url(
            BASE,
            "/api/class/fvBD.json?rsp-subtree=full",
            &params(&[("page", "0")]),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://apic.example.com/api/class/fvBD.json?rsp-subtree=full&page=0"
        );
    }

    #[test]
    fn test_query_uses_session_cookie() {
        let transport = MockTransport::new()
            .respond(200, LOGIN_OK)
            .respond(200, r#"{"totalCount":"0","imdata":[]}"#);
        let session = authenticate(&transport, BASE, "a", "b").unwrap();
        let result = query(&session, BASE, "class/fvTenant.json", &[]).unwrap();

        assert_eq!(result, serde_json::json!({"totalCount": "0", "imdata": []}));
        assert_eq!(transport.call_count(), 2);
        let call = transport.call(1);
        assert_eq!(call.method, "GET");
        assert_eq!(call.url, "https://apic.example.com/api/class/fvTenant.json");
        assert!(call
            .headers
            .contains(&("Cookie".to_string(), "APIC-cookie=tok-9".to_string())));
    }

    #[test]
    fn test_query_non_2xx() {
        let transport = MockTransport::new()
            .respond(200, LOGIN_OK)
            .respond(400, r#"{"imdata":[{"error":{}}]}"#);
        let session = authenticate(&transport, BASE, "a", "b").unwrap();
        let err = query(&session, BASE, "class/nope.json", &[]).unwrap_err();
        assert!(err.to_string().starts_with("API query failed: HTTP 400"));
    }

    #[test]
    fn test_query_transport_failure() {
        let transport = MockTransport::new()
            .respond(200, LOGIN_OK)
            .fail("timed out");
        let session = authenticate(&transport, BASE, "a", "b").unwrap();
        let err = query(&session, BASE, "class/fvTenant.json", &[]).unwrap_err();
        assert_eq!(err.to_string(), "API query failed: timed out");
    }

    #[test]
    fn test_query_non_json() {
        let transport = MockTransport::new()
            .respond(200, LOGIN_OK)
            .respond(200, "<imdata/>");
        let session = authenticate(&transport, BASE, "a", "b").unwrap();
        let err = query(&session, BASE, "class/fvTenant.xml", &[]).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON response from API: "));
    }
}
