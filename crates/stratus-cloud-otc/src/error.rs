//! Open Telekom Cloud provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtcError {
    #[error("Configuration error: {0}")]
    Config(#[from] stratus_config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, OtcError>;
