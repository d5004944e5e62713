use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::providers::wire::{self, ChatCompletionRequest, ChatCompletionResponse};
use crate::providers::{Provider, ProviderSelection, deepseek, openai};

/// Prefix on every failure string shown to the user.
pub const FAILURE_MARKER: &str = "❌ ";

/// What one chat turn produced. `Display` gives the text printed for the user.
#[derive(Debug)]
pub enum ChatReply {
    Answer(String),
    Failure(ChatError),
}

impl ChatReply {
    pub fn is_failure(&self) -> bool {
        matches!(self, ChatReply::Failure(_))
    }
}

impl From<Result<String, ChatError>> for ChatReply {
    fn from(result: Result<String, ChatError>) -> Self {
        match result {
            Ok(text) => ChatReply::Answer(text),
            Err(e) => ChatReply::Failure(e),
        }
    }
}

impl fmt::Display for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatReply::Answer(text) => f.write_str(text),
            ChatReply::Failure(e) => write!(f, "{FAILURE_MARKER}{e}"),
        }
    }
}

/// Sends one user message per call to the selected provider.
///
/// Holds a single HTTP client with the request timeout applied, plus the
/// endpoint bases for both providers.
pub struct ChatAdapter {
    http: reqwest::Client,
    deepseek_base_url: String,
    openai_base_url: String,
    timeout: Duration,
}

impl ChatAdapter {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Unknown(e.to_string()))?;

        Ok(Self {
            http,
            deepseek_base_url: config.deepseek_base_url.clone(),
            openai_base_url: config.openai_base_url.clone(),
            timeout: config.request_timeout,
        })
    }

    /// Exactly one request; every failure comes back as `ChatReply::Failure`.
    pub async fn send(&self, selection: &ProviderSelection, message: &str) -> ChatReply {
        let reply = ChatReply::from(self.complete(selection, message).await);
        if let ChatReply::Failure(e) = &reply {
            warn!(provider = selection.provider().id(), error = %e, "chat request failed");
        }
        reply
    }

    pub async fn complete(
        &self,
        selection: &ProviderSelection,
        message: &str,
    ) -> Result<String, ChatError> {
        match selection {
            ProviderSelection::DeepSeek(_) => {
                self.post(
                    Provider::DeepSeek,
                    &self.deepseek_base_url,
                    selection.api_key(),
                    &deepseek::request(message),
                )
                .await
            }
            ProviderSelection::OpenAi(_) => {
                self.post(
                    Provider::OpenAi,
                    &self.openai_base_url,
                    selection.api_key(),
                    &openai::request(message),
                )
                .await
            }
        }
    }

    async fn post(
        &self,
        provider: Provider,
        base_url: &str,
        api_key: &str,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<String, ChatError> {
        let url = format!("{base_url}/chat/completions");
        debug!(provider = provider.id(), %url, model = body.model, "sending chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(provider, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.request_error(provider, e))?;

        if !status.is_success() {
            return Err(ChatError::Status {
                provider,
                status,
                detail: wire::error_detail(&text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| ChatError::ResponseFormat {
                provider,
                detail: e.to_string(),
            })?;

        let content = parsed
            .into_first_content()
            .map_err(|detail| ChatError::ResponseFormat { provider, detail })?;

        debug!(
            provider = provider.id(),
            chars = content.chars().count(),
            "chat completion received"
        );
        Ok(content)
    }

    fn request_error(&self, provider: Provider, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Timeout {
                provider,
                timeout: self.timeout,
            }
        } else if e.is_builder() {
            ChatError::Unknown(e.to_string())
        } else {
            ChatError::Transport {
                provider,
                detail: e.to_string(),
            }
        }
    }
}
