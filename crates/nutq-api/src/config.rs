use nutq_attempt::SessionConfig;
use nutq_eval::AcceptancePolicy;
use serde::Deserialize;
use thiserror::Error;

/// Prefix of every environment variable read by [`ApiConfig`].
pub const ENV_PREFIX: &str = "NUTQ_";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Env(#[from] envy::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration, read from `NUTQ_*` environment variables.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of origins allowed by CORS.
    #[serde(default)]
    pub allowed_origins: String,
    pub accept_score_threshold: Option<f64>,
    pub accept_similarity_threshold: Option<f64>,
    /// Recognition language advertised to clients.
    pub language: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from explicit `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(score) = self.accept_score_threshold
            && !(0.0..=100.0).contains(&score)
        {
            return Err(ConfigError::Invalid(format!(
                "accept_score_threshold must be within 0..=100, got {score}"
            )));
        }
        if let Some(similarity) = self.accept_similarity_threshold
            && !(0.0..=1.0).contains(&similarity)
        {
            return Err(ConfigError::Invalid(format!(
                "accept_similarity_threshold must be within 0..=1, got {similarity}"
            )));
        }
        Ok(())
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Acceptance policy with any configured threshold overrides.
    pub fn policy(&self) -> AcceptancePolicy {
        let defaults = AcceptancePolicy::default();
        AcceptancePolicy {
            score_threshold: self.accept_score_threshold.unwrap_or(defaults.score_threshold),
            similarity_threshold: self
                .accept_similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            ..defaults
        }
    }

    /// Session settings advertised to practice clients.
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            language: self.language.clone().unwrap_or(defaults.language),
            policy: self.policy(),
            timings: defaults.timings,
        }
    }
}
