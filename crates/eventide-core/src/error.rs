use thiserror::Error;

/// Errors raised while loading or interpreting configuration
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
