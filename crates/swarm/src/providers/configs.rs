use anyhow::{anyhow, Result};
use std::env;
use std::fmt;

pub const OPENAI_HOST: &str = "https://api.openai.com";

/// Connection settings for an OpenAI-compatible chat completions endpoint
#[derive(Clone, PartialEq)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    /// Route all API traffic through this HTTP(S) proxy
    pub proxy: Option<String>,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            proxy: None,
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_proxy<S: Into<String>>(mut self, proxy: S) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Load from `OPENAI_API_KEY` (required), `OPENAI_HOST` and `OPENAI_PROXY`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = get("OPENAI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("Environment variable 'OPENAI_API_KEY' is required but not set."))?;

        let mut config = Self::new(api_key);
        if let Some(host) = get("OPENAI_HOST") {
            config.host = host;
        }
        config.proxy = get("OPENAI_PROXY").filter(|proxy| !proxy.is_empty());
        Ok(config)
    }
}

impl fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("proxy", &self.proxy)
            .finish()
    }
}
