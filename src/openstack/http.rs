//! HTTP utilities for OpenStack REST API calls

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

/// Header carrying the identity token on every service call
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for OpenStack API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("osinventory/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make an authenticated GET request to a service endpoint
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to send request")?;

        Self::read_json(response).await
    }

    /// POST a JSON document without a token (identity requests)
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only the sanitized body is logged; it may echo request details
            tracing::warn!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("{}{}", API_FAILURE_PREFIX, status));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

impl std::fmt::Debug for ApiHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHttpClient").finish_non_exhaustive()
    }
}

/// Prefix of the error raised for a non-success response
const API_FAILURE_PREFIX: &str = "API request failed: ";

/// HTTP status of a failed API request anywhere in the error chain
fn api_status(error: &anyhow::Error) -> Option<u16> {
    error.chain().find_map(|cause| {
        cause
            .to_string()
            .strip_prefix(API_FAILURE_PREFIX)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|code| code.parse().ok())
    })
}

/// Format an OpenStack API error for a one-line log entry
pub fn format_api_error(error: &anyhow::Error) -> String {
    match api_status(error) {
        Some(401) => return "Authentication failed. Check OS_USERNAME / OS_PASSWORD.".to_string(),
        Some(403) => return "Permission denied for this project.".to_string(),
        Some(404) => return "Service endpoint not found.".to_string(),
        Some(500 | 502 | 503 | 504) => return "Service temporarily unavailable.".to_string(),
        _ => {}
    }

    if let Some(cause) = error
        .chain()
        .find(|cause| cause.to_string().starts_with("No endpoint"))
    {
        return cause.to_string();
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test long bodies are truncated before logging
    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(out.contains("500 bytes total"));
    }

    /// Test control characters are stripped before logging
    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    /// Test common statuses map to friendly messages
    #[test]
    fn test_format_api_error_maps_statuses() {
        let err = anyhow::anyhow!("API request failed: 401 Unauthorized");
        assert!(format_api_error(&err).starts_with("Authentication failed"));

        let err = anyhow::anyhow!("API request failed: 503 Service Unavailable");
        assert_eq!(format_api_error(&err), "Service temporarily unavailable.");

        let err = anyhow::anyhow!("API request failed: 404 Not Found").context("Failed to list servers");
        assert_eq!(format_api_error(&err), "Service endpoint not found.");
    }

    /// Test status-like numbers outside a failed request are not mapped
    #[test]
    fn test_format_api_error_ignores_stray_numbers() {
        let err = anyhow::anyhow!("expected value at line 1 column 500")
            .context("Failed to parse response JSON");
        assert_eq!(
            format_api_error(&err),
            "Failed to parse response JSON: expected value at line 1 column 500"
        );

        let err = anyhow::anyhow!("Unknown server 404-abc");
        assert_eq!(format_api_error(&err), "Unknown server 404-abc");

        let err = anyhow::anyhow!("No endpoint for service 'image' in region 'fr1'")
            .context("Failed to list images");
        assert_eq!(
            format_api_error(&err),
            "No endpoint for service 'image' in region 'fr1'"
        );
    }
}
