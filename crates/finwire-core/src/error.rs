use std::time::Duration;

use thiserror::Error;

use crate::http_client::{HttpError, HttpErrorKind};

/// Errors that decide whether an operation is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Caller-visible error for every request issued through `ApiClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no data returned for '{endpoint}'")]
    EmptyResult { endpoint: String },

    #[error("api error for '{endpoint}': {message}")]
    Api { endpoint: String, message: String },

    #[error("failed to decode response for '{endpoint}': {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body for '{endpoint}': {source}")]
    Encode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limit exceeded; retry in {:.1}s", .retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    #[error("request failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Key used by the per-error counters of the metrics collector.
    pub fn metric_label(&self) -> String {
        match self {
            Self::Config(_) => String::from("config"),
            Self::InvalidInput(_) => String::from("invalid_input"),
            Self::Transport(error) => match error.kind() {
                HttpErrorKind::Timeout => String::from("transport.timeout"),
                HttpErrorKind::Connect => String::from("transport.connect"),
                HttpErrorKind::Other => String::from("transport.other"),
            },
            Self::Status { status, .. } => format!("http.{status}"),
            Self::EmptyResult { .. } => String::from("empty_result"),
            Self::Api { .. } => String::from("api_error"),
            Self::Decode { .. } => String::from("decode"),
            Self::Encode { .. } => String::from("encode"),
            Self::RateLimited { .. } => String::from("rate_limited"),
            Self::RetryExhausted { source, .. } => source.metric_label(),
        }
    }
}

impl Retryable for ClientError {
    /// Connection failures, timeouts, 5xx and 429 are transient; everything else is final.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(error) => match error.kind() {
                HttpErrorKind::Timeout | HttpErrorKind::Connect => true,
                HttpErrorKind::Other => mentions_timeout(error.message()),
            },
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Api { message, .. } => mentions_timeout(message),
            _ => false,
        }
    }
}

fn mentions_timeout(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("timeout") || lower.contains("timed out")
}
