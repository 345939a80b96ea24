//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading the buff mapping file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse config JSON in {path}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file {path} has no mappings table")]
    MissingMappings { path: PathBuf },

    #[error("failed to copy config template {template} to {path}")]
    CopyTemplate {
        template: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
