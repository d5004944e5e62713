use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::providers::Provider;

/// Startup failures. Printed once, then the process returns without entering the loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("unsupported model provider '{0}'")]
    UnsupportedProvider(String),

    #[error("{} is not set", .0.credential_var())]
    MissingCredential(Provider),
}

impl ResolutionError {
    /// Follow-up line printed under the error at startup.
    pub fn hint(&self) -> String {
        match self {
            ResolutionError::UnsupportedProvider(_) => {
                format!("Supported providers: {}", Provider::supported())
            }
            ResolutionError::MissingCredential(provider) => {
                format!("Set {} in your .env file", provider.credential_var())
            }
        }
    }
}

/// Failures of a single chat turn. Never escapes `ChatAdapter::send`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{provider} API request failed: {detail}")]
    Transport { provider: Provider, detail: String },

    #[error("{provider} API request timed out after {}s", .timeout.as_secs())]
    Timeout {
        provider: Provider,
        timeout: Duration,
    },

    #[error("{provider} API request failed: HTTP {status}{}", format_detail(.detail))]
    Status {
        provider: Provider,
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("{provider} API response format error: {detail}")]
    ResponseFormat { provider: Provider, detail: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn format_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}
