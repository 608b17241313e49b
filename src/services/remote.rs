//! Remote Service Helpers
//!
//! Shared HTTP plumbing for the background-removal and outpaint proxies.

use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Build the shared client. No timeout unless one is configured.
pub fn build_client(timeout_secs: Option<u64>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

/// Human-readable message for a failed response: the JSON `{error}` field
/// when present, else the raw body, else the status reason.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return parsed.error;
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
