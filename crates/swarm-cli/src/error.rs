use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration, set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings path such as `openai.api_key` to the environment variable
/// that sets it
pub fn to_env_var(field: &str) -> String {
    format!("SWARM_{}", field.to_uppercase().replace('.', "__"))
}
