use thiserror::Error;

/// Errors raised while loading typed settings from the process environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from environment: {0}")]
    Env(#[from] envy::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
