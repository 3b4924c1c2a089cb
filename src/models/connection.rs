use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::models::settings::{config_file, read_toml_or_default, write_toml};

const CONNECTION_FILE: &str = "connection.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Trimmed `(key, value)` pair, or `None` if either side is blank.
    pub(crate) fn trimmed(&self) -> Option<(&str, &str)> {
        let key = self.key.trim();
        let value = self.value.trim();
        if key.is_empty() || value.is_empty() {
            None
        } else {
            Some((key, value))
        }
    }
}

/// Everything needed to open a session against a broker.
///
/// The last form the user connected with is kept in `connection.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    pub subscription_url: String,
    pub virtual_host: Option<String>,
    pub headers: Vec<Header>,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>, subscription_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subscription_url: subscription_url.into(),
            virtual_host: None,
            headers: Vec::new(),
        }
    }

    pub fn with_virtual_host(mut self, virtual_host: impl Into<String>) -> Self {
        self.virtual_host = Some(virtual_host.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    pub fn default_path() -> Result<PathBuf, SettingsError> {
        config_file(CONNECTION_FILE)
    }

    /// Stored connection form, or an empty one if nothing was saved yet.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        read_toml_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        write_toml(path, self)
    }

    fn virtual_host_opt(&self) -> Option<&str> {
        let value = self.virtual_host.as_deref()?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Headers sent with the STOMP CONNECT frame.
    ///
    /// Blank pairs are dropped, a repeated key keeps its position but takes the
    /// later value, and `host` from the virtual host is applied last.
    pub fn connect_headers(&self) -> Vec<Header> {
        let mut merged: Vec<Header> = Vec::new();
        let pairs = self.headers.iter().filter_map(Header::trimmed);
        let host = self.virtual_host_opt().map(|host| ("host", host));

        for (key, value) in pairs.chain(host) {
            if let Some(existing) = merged.iter_mut().find(|header| header.key == key) {
                existing.value = value.to_string();
            } else {
                merged.push(Header::new(key, value));
            }
        }

        merged
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error {
        message: String,
    },
}

impl ConnectionStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connecting => f.write_str("Connecting..."),
            Self::Connected => f.write_str("Connected"),
            Self::Error { message } => write!(f, "Error: {message}"),
        }
    }
}
