use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read simulation settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid simulation settings: {0}")]
    Invalid(String),
}
