//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("Cannot read {resource} as {target}: {message}")]
    Projection {
        resource: String,
        target: &'static str,
        message: String,
    },

    #[error("Failed to fetch {kind}: {source}")]
    Fetch {
        kind: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
