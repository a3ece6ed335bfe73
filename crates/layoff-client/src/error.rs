use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::ApiFailure;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Api(#[from] ApiFailure),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// A newer request for the same slot was issued before this one resolved;
    /// its outcome was discarded.
    #[error("Superseded by a newer request")]
    Superseded,
}

impl ClientError {
    /// Message suitable for a store's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the normalized gateway failure, if this error came from the API.
    pub fn as_api_failure(&self) -> Option<&ApiFailure> {
        match self {
            ClientError::Api(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Client-side input validation failure. Raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl ValidationError {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read storage file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write storage file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize storage contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
