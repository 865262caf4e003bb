//! Shared HTTP plumbing for upstream collaborators

use countrysim_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client with request and connect timeouts
pub fn create_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .build()
        .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}

/// Only http and https endpoints are accepted
pub fn validate_url(url: &str) -> Result<()> {
    let has_scheme = url.starts_with("http://") || url.starts_with("https://");
    if !has_scheme || url.len() < 10 {
        return Err(Error::InvalidConfig(format!(
            "invalid URL '{}': expected an http or https endpoint",
            url
        )));
    }
    Ok(())
}

/// Error for a non-success HTTP response
pub fn upstream_status_error(service: &str, status: u16, body: &str) -> Error {
    let excerpt: String = body.chars().take(200).collect();
    Error::UpstreamUnavailable(format!("{} returned HTTP {}: {}", service, status, excerpt))
}

/// Error for a transport failure (connect, timeout, decode)
pub fn upstream_transport_error(service: &str, err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_decode() {
        "invalid response body"
    } else {
        "request failed"
    };
    Error::UpstreamUnavailable(format!("{} {}: {}", service, kind, err))
}
