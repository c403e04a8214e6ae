//! HTTP client construction, auth headers, and status mapping.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{KaiwaError, Result};

/// Build a reqwest client with the given per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(KaiwaError::from)
}

/// Build JSON headers, optionally with a Bearer token.
pub fn json_headers(bearer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = bearer {
        insert_bearer(&mut headers, token);
    }
    headers
}

/// Build headers for an SDP offer upload.
pub fn sdp_headers(bearer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/sdp"));
    insert_bearer(&mut headers, bearer);
    headers
}

fn insert_bearer(headers: &mut HeaderMap, token: &str) {
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> KaiwaError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => KaiwaError::Authentication(message),
        _ => KaiwaError::api(status, message),
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn extract_error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_to_error_unwraps_json_error_message() {
        let err = status_to_error(500, r#"{"error":{"message":"upstream down"}}"#);
        assert!(matches!(err, KaiwaError::Api { status: 500, ref message } if message == "upstream down"));
    }

    #[test]
    fn status_to_error_keeps_plain_bodies() {
        let err = status_to_error(401, "Unauthorized");
        assert!(matches!(err, KaiwaError::Authentication(ref message) if message == "Unauthorized"));
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://x/", "/api/session"), "http://x/api/session");
        assert_eq!(join_url("http://x", "api/session"), "http://x/api/session");
    }

    #[test]
    fn sdp_headers_use_sdp_content_type() {
        let headers = sdp_headers("ek_123");
        assert_eq!(headers[CONTENT_TYPE], "application/sdp");
        assert_eq!(headers[AUTHORIZATION], "Bearer ek_123");
    }
}
