use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use swarm::providers::configs::{OpenAiProviderConfig, OPENAI_HOST};
use swarm::DEFAULT_MAX_TURNS;

pub const CONFIG_FILE: &str = "swarm.toml";

#[derive(Debug, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            host: default_openai_host(),
            api_key: None,
            proxy: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Model used by the router and the built-in agents
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// YAML team file to load instead of the built-in sales team
    #[serde(default)]
    pub team: Option<PathBuf>,
    #[serde(default)]
    pub openai: OpenAiSettings,
}

impl Settings {
    /// Defaults, then `swarm.toml` in the working directory if present, then
    /// `SWARM_` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Some(Path::new(CONFIG_FILE)), None)
    }

    fn load(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("model", default_model())?
            .set_default("max_turns", default_max_turns() as u64)?
            .set_default("openai.host", default_openai_host())?;

        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("SWARM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match &err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                },
                _ => ConfigError::Other(err),
            }
        })
    }

    pub fn provider_config(&self) -> Result<OpenAiProviderConfig, ConfigError> {
        let api_key = self
            .openai
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar {
                env_var: to_env_var("openai.api_key"),
            })?;

        let mut config = OpenAiProviderConfig::new(api_key).with_host(&self.openai.host);
        if let Some(proxy) = &self.openai.proxy {
            config = config.with_proxy(proxy);
        }
        Ok(config)
    }
}

fn default_model() -> String {
    swarm::agent::DEFAULT_MODEL.to_string()
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::load(None, env(&[])).unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.max_turns, 10);
        assert_eq!(settings.team, None);
        assert_eq!(settings.openai.host, "https://api.openai.com");
        assert_eq!(settings.openai.api_key, None);
        assert_eq!(settings.openai.proxy, None);
    }

    #[test]
    fn test_environment_override() {
        let settings = Settings::load(
            None,
            env(&[
                ("SWARM_MODEL", "gpt-4o-mini"),
                ("SWARM_MAX_TURNS", "3"),
                ("SWARM_OPENAI__API_KEY", "sk-test"),
                ("SWARM_OPENAI__HOST", "http://localhost:8080"),
                ("SWARM_OPENAI__PROXY", "http://proxy:3128"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_turns, 3);

        let config = settings.provider_config().unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swarm.toml");
        fs::write(
            &path,
            r#"
model = "file-model"
max_turns = 4
team = "team.yaml"

[openai]
api_key = "sk-file"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path), env(&[("SWARM_MAX_TURNS", "7")])).unwrap();
        assert_eq!(settings.model, "file-model");
        assert_eq!(settings.max_turns, 7);
        assert_eq!(settings.team, Some(PathBuf::from("team.yaml")));
        assert_eq!(settings.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(settings.openai.host, "https://api.openai.com");
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("swarm.toml")), env(&[])).unwrap();
        assert_eq!(settings.max_turns, 10);
    }

    #[test]
    fn test_missing_api_key_names_the_variable() {
        let settings = Settings::load(None, env(&[])).unwrap();
        let err = settings.provider_config().unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::MissingEnvVar { env_var } if env_var == "SWARM_OPENAI__API_KEY"
        ));
    }
}
