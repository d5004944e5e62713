pub mod deepseek;
pub mod openai;
pub(crate) mod wire;

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{Config, DEEPSEEK_API_KEY_VAR, OPENAI_API_KEY_VAR};
use crate::error::ResolutionError;

/// Supported chat-completion backends.
/// Enum: adding a provider is checked by every `match` at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    DeepSeek,
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::DeepSeek, Provider::OpenAi];

    /// Lowercase name accepted in `MODEL_PROVIDER`.
    pub fn id(self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::OpenAi => "openai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::DeepSeek => "DeepSeek",
            Provider::OpenAi => "OpenAI",
        }
    }

    pub fn credential_var(self) -> &'static str {
        match self {
            Provider::DeepSeek => DEEPSEEK_API_KEY_VAR,
            Provider::OpenAi => OPENAI_API_KEY_VAR,
        }
    }

    /// Case-insensitive lookup by id.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::ALL.into_iter().find(|p| p.id() == name)
    }

    /// Comma-separated ids, for user-facing hints.
    pub fn supported() -> String {
        Self::ALL.map(Provider::id).join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A provider together with the credential that authorizes it.
/// Resolved once at startup and never mutated.
#[derive(Debug)]
pub enum ProviderSelection {
    DeepSeek(SecretString),
    OpenAi(SecretString),
}

impl ProviderSelection {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderSelection::DeepSeek(_) => Provider::DeepSeek,
            ProviderSelection::OpenAi(_) => Provider::OpenAi,
        }
    }

    pub(crate) fn api_key(&self) -> &str {
        match self {
            ProviderSelection::DeepSeek(key) | ProviderSelection::OpenAi(key) => {
                key.expose_secret()
            }
        }
    }
}

/// Pick the configured provider and its credential. Reads `config` only.
pub fn resolve(config: &Config) -> Result<ProviderSelection, ResolutionError> {
    let provider = Provider::from_name(&config.provider)
        .ok_or_else(|| ResolutionError::UnsupportedProvider(config.provider.clone()))?;

    let key = match provider {
        Provider::DeepSeek => config.deepseek_api_key.as_ref(),
        Provider::OpenAi => config.openai_api_key.as_ref(),
    }
    .ok_or(ResolutionError::MissingCredential(provider))?;

    let key = SecretString::from(key.expose_secret().to_owned());
    Ok(match provider {
        Provider::DeepSeek => ProviderSelection::DeepSeek(key),
        Provider::OpenAi => ProviderSelection::OpenAi(key),
    })
}
