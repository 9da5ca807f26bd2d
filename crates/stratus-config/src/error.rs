use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "Configuration file not found: {0}\n\
        Set STRATUS_CONFIG_PATH or create ~/.config/stratus/config.yaml"
    )]
    FileNotFound(PathBuf),

    #[error("Missing required setting \"{field}\" (set it in the config file or via {env})")]
    MissingField {
        field: &'static str,
        env: &'static str,
    },

    #[error("Invalid endpoint for {service}: {url}")]
    InvalidEndpoint { service: String, url: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
