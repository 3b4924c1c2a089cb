use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a transport client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid broker url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("activation failed: {0}")]
    Activate(String),
    #[error("deactivation failed: {0}")]
    Deactivate(String),
    #[error("subscribe to '{destination}' failed: {reason}")]
    Subscribe { destination: String, reason: String },
    #[error("publish to '{destination}' failed: {reason}")]
    Publish { destination: String, reason: String },
    #[error("transport channel is closed")]
    Closed,
}

/// Failure returned by an explicit session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session task is not available")]
    Closed,
}

/// Input rejected before it reaches the session.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("broker url is required")]
    MissingUrl,
    #[error("subscription destination is required")]
    MissingSubscriptionUrl,
    #[error("destination is required")]
    MissingDestination,
    #[error("message content is required")]
    MissingContent,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Failure reading or writing the settings or connection file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}
