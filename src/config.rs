use std::env;

const DEFAULT_API_HOST: &str = "https://api.openai.com";
const DEFAULT_API_VERSION: &str = "2023-03-15-preview";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Which upstream API shape the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Single endpoint, bearer-token auth, `model` in the request body.
    OpenAi,
    /// Per-family regional hosts and deployment ids, `api-key` auth.
    Azure,
}

/// Environment-derived configuration, assembled once at startup and passed
/// explicitly into the resolver and issuer. Never read ad hoc deeper down.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub backend: BackendKind,
    pub api_host: String,
    pub api_host_gpt35: Option<String>,
    pub api_host_gpt4: Option<String>,
    pub api_key: Option<String>,
    pub api_key_gpt35: Option<String>,
    pub api_key_gpt4: Option<String>,
    pub api_version: String,
    pub organization: Option<String>,
    pub deployment_id: Option<String>,
    pub deployment_id_gpt35: Option<String>,
    pub deployment_id_gpt4: Option<String>,
    pub connect_timeout_secs: u64,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let host = |name: &str| get(name).map(|value| value.trim_end_matches('/').to_owned());

        let backend = match get("OPENAI_API_TYPE").as_deref() {
            Some("azure") => BackendKind::Azure,
            _ => BackendKind::OpenAi,
        };

        Self {
            backend,
            api_host: host("OPENAI_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_owned()),
            api_host_gpt35: host("OPENAI_API_HOST_3"),
            api_host_gpt4: host("OPENAI_API_HOST_4"),
            api_key: get("OPENAI_API_KEY"),
            api_key_gpt35: get("OPENAI_API_KEY_3"),
            api_key_gpt4: get("OPENAI_API_KEY_4"),
            api_version: get("OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            organization: get("OPENAI_ORGANIZATION"),
            deployment_id: get("AZURE_DEPLOYMENT_ID"),
            deployment_id_gpt35: get("AZURE_DEPLOYMENT_ID_3"),
            deployment_id_gpt4: get("AZURE_DEPLOYMENT_ID_4"),
            connect_timeout_secs: get("RELAY_CONNECT_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}
