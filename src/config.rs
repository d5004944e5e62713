use std::collections::HashMap;
use std::ffi::OsString;
use std::io::Read;
use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

pub const PROVIDER_VAR: &str = "MODEL_PROVIDER";
pub const DEFAULT_PROVIDER: &str = "deepseek";
pub const DEEPSEEK_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEEPSEEK_BASE_URL_VAR: &str = "DEEPSEEK_BASE_URL";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const TIMEOUT_VAR: &str = "CHAT_TIMEOUT_SECS";

pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the client reads from its environment, captured once at startup.
///
/// Built from a `.env` file overlaid by the process environment. The process
/// environment itself is never modified.
#[derive(Debug)]
pub struct Config {
    /// Raw provider name as configured. Resolution lower-cases it.
    pub provider: String,
    pub deepseek_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub deepseek_base_url: String,
    pub openai_base_url: String,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_owned(),
            deepseek_api_key: None,
            openai_api_key: None,
            deepseek_base_url: DEFAULT_DEEPSEEK_BASE_URL.to_owned(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Load from `./.env` (if present) and the process environment. Process values win.
    pub fn load() -> Self {
        Self::from_sources(dotenvy::dotenv_iter().ok(), std::env::vars_os())
    }

    /// Process entries that are not valid UTF-8 are skipped.
    pub(crate) fn from_sources<R: Read>(
        dotenv: Option<dotenvy::Iter<R>>,
        process: impl IntoIterator<Item = (OsString, OsString)>,
    ) -> Self {
        let mut vars = HashMap::new();
        if let Some(iter) = dotenv {
            for item in iter {
                match item {
                    Ok((key, value)) => {
                        vars.insert(key, value);
                    }
                    Err(e) => warn!(error = %e, "skipping malformed .env entry"),
                }
            }
        }
        for (key, value) in process {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => {
                    vars.insert(key, value);
                }
                (Ok(key), Err(_)) => {
                    warn!(%key, "ignoring environment variable with non-UTF-8 value");
                }
                (Err(_), _) => {}
            }
        }
        Self::from_vars(vars)
    }

    /// Build from an explicit variable map. Unknown keys are ignored.
    pub fn from_vars(mut vars: HashMap<String, String>) -> Self {
        let defaults = Self::default();

        Self {
            provider: vars.remove(PROVIDER_VAR).unwrap_or(defaults.provider),
            deepseek_api_key: credential(vars.remove(DEEPSEEK_API_KEY_VAR)),
            openai_api_key: credential(vars.remove(OPENAI_API_KEY_VAR)),
            deepseek_base_url: base_url(vars.remove(DEEPSEEK_BASE_URL_VAR))
                .unwrap_or(defaults.deepseek_base_url),
            openai_base_url: base_url(vars.remove(OPENAI_BASE_URL_VAR))
                .unwrap_or(defaults.openai_base_url),
            request_timeout: vars
                .remove(TIMEOUT_VAR)
                .map(|raw| parse_timeout(&raw))
                .unwrap_or(defaults.request_timeout),
        }
    }
}

/// Empty values count as unset.
fn credential(value: Option<String>) -> Option<SecretString> {
    value.filter(|v| !v.is_empty()).map(SecretString::from)
}

fn base_url(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().trim_end_matches('/').to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_timeout(raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(
                value = raw,
                default_secs = DEFAULT_TIMEOUT.as_secs(),
                "invalid {TIMEOUT_VAR}, using default"
            );
            DEFAULT_TIMEOUT
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_vars(HashMap::new());
        assert_eq!(config.provider, "deepseek");
        assert!(config.deepseek_api_key.is_none());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.deepseek_base_url, DEFAULT_DEEPSEEK_BASE_URL);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_known_variables() {
        let config = Config::from_vars(vars(&[
            ("MODEL_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("CHAT_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.provider, "OpenAI");
        assert_eq!(
            config.openai_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-test")
        );
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_credential_is_unset() {
        let config = Config::from_vars(vars(&[("DEEPSEEK_API_KEY", "")]));
        assert!(config.deepseek_api_key.is_none());
    }

    #[test]
    fn empty_provider_is_kept() {
        let config = Config::from_vars(vars(&[("MODEL_PROVIDER", "")]));
        assert_eq!(config.provider, "");
    }

    #[test]
    fn invalid_timeout_falls_back() {
        for raw in ["0", "-3", "soon", ""] {
            let config = Config::from_vars(vars(&[("CHAT_TIMEOUT_SECS", raw)]));
            assert_eq!(config.request_timeout, DEFAULT_TIMEOUT, "value {raw:?}");
        }
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = Config::from_vars(vars(&[("DEEPSEEK_API_KEY", "sk-very-secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
    }

    #[test]
    fn dotenv_file_is_overridden_by_process_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MODEL_PROVIDER=openai").unwrap();
        writeln!(file, "OPENAI_API_KEY=sk-from-file").unwrap();
        writeln!(file, "DEEPSEEK_API_KEY=ds-from-file").unwrap();
        file.flush().unwrap();

        let iter = dotenvy::from_path_iter(file.path()).unwrap();
        let process = vec![(
            OsString::from("OPENAI_API_KEY"),
            OsString::from("sk-from-process"),
        )];
        let config = Config::from_sources(Some(iter), process);

        assert_eq!(config.provider, "openai");
        assert_eq!(
            config.openai_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-from-process")
        );
        assert_eq!(
            config.deepseek_api_key.as_ref().map(|k| k.expose_secret()),
            Some("ds-from-file")
        );
    }

    #[test]
    fn missing_dotenv_uses_process_only() {
        let process = vec![(OsString::from("MODEL_PROVIDER"), OsString::from("deepseek"))];
        let config = Config::from_sources::<std::fs::File>(None, process);
        assert_eq!(config.provider, "deepseek");
        assert!(config.deepseek_api_key.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_process_entries_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let process = vec![
            (OsString::from("STRAY"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![b'K', 0xff]), OsString::from("v")),
            (OsString::from("OPENAI_API_KEY"), OsString::from_vec(vec![0x80])),
            (OsString::from("MODEL_PROVIDER"), OsString::from("openai")),
            (OsString::from("DEEPSEEK_API_KEY"), OsString::from("ds-key")),
        ];
        let config = Config::from_sources::<std::fs::File>(None, process);

        assert_eq!(config.provider, "openai");
        assert!(config.openai_api_key.is_none());
        assert_eq!(
            config.deepseek_api_key.as_ref().map(|k| k.expose_secret()),
            Some("ds-key")
        );
    }
}
