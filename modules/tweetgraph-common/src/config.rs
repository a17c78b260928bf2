use std::env;

use crate::error::ConfigError;

/// Connection settings loaded from environment variables.
/// Ingestion behavior lives in the TOML `FileConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            neo4j_uri: required_env("NEO4J_URI")?,
            neo4j_user: env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string()),
            neo4j_password: required_env("NEO4J_PASSWORD")?,
        })
    }

    /// Log the loaded settings without leaking the password.
    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  NEO4J_URI: {}", self.neo4j_uri);
        tracing::info!("  NEO4J_USER: {}", self.neo4j_user);
        tracing::info!("  NEO4J_PASSWORD: {}", redact(&self.neo4j_password));
    }
}

/// Length only; no characters of the secret.
fn redact(secret: &str) -> String {
    format!("<redacted, {} chars>", secret.chars().count())
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnv(key))
}
