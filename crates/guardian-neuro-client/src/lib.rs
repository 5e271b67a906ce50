#![warn(missing_docs)]
//! # guardian-neuro-client
//!
//! ## Purpose
//! Sends analysis requests to the remote generative-AI endpoint.
//!
//! ## Responsibilities
//! - Validate the API base URL policy and build the `generateContent` URL.
//! - Execute one POST per request through an injectable transport.
//! - Map non-2xx responses to `API Error: <server message>`.
//!
//! ## Data flow
//! [`guardian_neuro_core::AnalysisRequest`] -> JSON body ->
//! [`AnalysisTransport::post_json`] -> raw response text handed to the report
//! parser.
//!
//! ## Ownership and lifetimes
//! The client owns its endpoint configuration; transports are shared through
//! `Arc` so tests can inspect calls after the fact.
//!
//! ## Error model
//! [`ClientError::Api`] for non-2xx responses, [`ClientError::Transport`] for
//! connection or timeout failures, [`ClientError::InvalidEndpoint`] for
//! configuration mistakes. There is no retry: every call is single-shot.
//!
//! ## Security and privacy notes
//! The API key travels as a query credential. It is never logged; use
//! [`GenerateContentEndpoint::redacted`] for diagnostics.

use std::sync::Arc;
use std::time::Duration;

use guardian_neuro_analysis_contract::extract_api_error_message;
use guardian_neuro_core::{AnalysisRequest, CoreError};
use thiserror::Error;
use url::Url;

/// Default API base for model calls.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract transport used by the analysis client.
pub trait AnalysisTransport: Send + Sync {
    /// Posts a JSON body and returns the raw response.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] when no response was received.
    fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<TransportResponse, ClientError>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport with the given request timeout.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ClientError::Transport(format!("http client init failed: {error}")))?;
        Ok(Self { client })
    }
}

impl AnalysisTransport for HttpTransport {
    fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<TransportResponse, ClientError> {
        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|error| {
                // reqwest errors embed the URL, which carries the key.
                let error = error.without_url();
                if error.is_timeout() {
                    ClientError::Transport(format!("request timed out: {error}"))
                } else if error.is_connect() {
                    ClientError::Transport(format!("connection failed: {error}"))
                } else {
                    ClientError::Transport(error.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|error| ClientError::Transport(error.without_url().to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

/// Fully resolved `generateContent` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateContentEndpoint {
    url: Url,
}

impl GenerateContentEndpoint {
    /// Builds `<api_base>/<model>:generateContent?key=<api_key>`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidEndpoint`] when the base is not a valid
    /// HTTPS URL (plain HTTP is allowed only for loopback hosts) or when the
    /// model or key is blank.
    pub fn new(api_base: &str, model: &str, api_key: &str) -> Result<Self, ClientError> {
        let base = validate_api_base(api_base)?;
        if model.trim().is_empty() {
            return Err(ClientError::InvalidEndpoint("model name is empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(ClientError::InvalidEndpoint("api key is empty".to_string()));
        }

        let joined = format!(
            "{}/{}:generateContent",
            base.as_str().trim_end_matches('/'),
            model.trim()
        );
        let mut url = Url::parse(&joined)
            .map_err(|error| ClientError::InvalidEndpoint(format!("invalid model url: {error}")))?;
        url.query_pairs_mut().append_pair("key", api_key.trim());
        Ok(Self { url })
    }

    /// Returns the full URL including the key.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL with the key value replaced, for logs.
    pub fn redacted(&self) -> String {
        let mut redacted = self.url.clone();
        redacted.set_query(Some("key=REDACTED"));
        redacted.to_string()
    }
}

/// Validates the API base URL policy.
///
/// # Errors
/// Returns [`ClientError::InvalidEndpoint`] for unparsable URLs, or non-HTTPS
/// schemes on non-loopback hosts.
pub fn validate_api_base(api_base: &str) -> Result<Url, ClientError> {
    let parsed = Url::parse(api_base.trim())
        .map_err(|error| ClientError::InvalidEndpoint(format!("invalid api base: {error}")))?;

    let loopback = matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if loopback => Ok(parsed),
        _ => Err(ClientError::InvalidEndpoint(
            "api base must use https".to_string(),
        )),
    }
}

/// Single-shot analysis client.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoint: GenerateContentEndpoint,
    transport: Arc<dyn AnalysisTransport>,
}

impl AnalysisClient {
    /// Creates a client for a resolved endpoint.
    pub fn new(endpoint: GenerateContentEndpoint, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &GenerateContentEndpoint {
        &self.endpoint
    }

    /// Submits one request and returns the raw 2xx response body.
    ///
    /// # Errors
    /// - [`ClientError::Codec`] when the payload cannot be encoded.
    /// - [`ClientError::Transport`] when no response arrives.
    /// - [`ClientError::Api`] for non-2xx responses.
    pub fn submit(&self, request: &AnalysisRequest) -> Result<String, ClientError> {
        let body = request.to_json_bytes()?;
        tracing::info!(
            endpoint = %self.endpoint.redacted(),
            images = request.images.len(),
            body_bytes = body.len(),
            "dispatching analysis request"
        );

        let response = self.transport.post_json(self.endpoint.url(), body)?;
        if !response.is_success() {
            let message = api_error_message(&response);
            tracing::warn!(status = response.status, %message, "analysis request rejected");
            return Err(ClientError::Api {
                status: response.status,
                message,
            });
        }

        tracing::info!(status = response.status, "analysis response received");
        Ok(response.body)
    }
}

/// Picks the user-visible message for a non-2xx response.
pub fn api_error_message(response: &TransportResponse) -> String {
    if let Some(message) = extract_api_error_message(&response.body) {
        return message;
    }

    let trimmed = response.body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

/// Remote client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint violates URL policy or is incomplete.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request payload could not be encoded.
    #[error("request encoding failure: {0}")]
    Codec(#[from] CoreError),
    /// No HTTP response was received.
    #[error("Request failed: {0}")]
    Transport(String),
    /// Remote service answered with a non-2xx status.
    #[error("API Error: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint construction and error messages.

    use super::*;

    #[test]
    fn builds_generate_content_url_with_key() {
        let endpoint =
            GenerateContentEndpoint::new(DEFAULT_API_BASE, DEFAULT_MODEL, "secret-key").unwrap();
        assert_eq!(
            endpoint.url().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent?key=secret-key"
        );
        assert!(!endpoint.redacted().contains("secret-key"));
    }

    #[test]
    fn validates_api_base_policy() {
        assert!(validate_api_base("https://example.test/v1beta/models").is_ok());
        assert!(validate_api_base("http://127.0.0.1:8080/models").is_ok());
        assert!(validate_api_base("http://example.test/models").is_err());
        assert!(validate_api_base("not a url").is_err());
        assert!(GenerateContentEndpoint::new(DEFAULT_API_BASE, DEFAULT_MODEL, " ").is_err());
    }

    #[test]
    fn error_message_falls_back_to_body_then_status() {
        let body = TransportResponse {
            status: 502,
            body: "upstream down".to_string(),
        };
        assert_eq!(api_error_message(&body), "upstream down");

        let empty = TransportResponse {
            status: 503,
            body: String::new(),
        };
        assert_eq!(api_error_message(&empty), "Service Unavailable");
    }
}
