use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const SETTINGS_FILE: &str = "settings.toml";

/// Read-only view of the settings the session consults.
///
/// Values may change at any time; callers read them at each decision point
/// instead of caching them.
pub trait SettingsProvider: Send + Sync + 'static {
    fn auto_reconnect(&self) -> bool;
    fn max_messages(&self) -> usize;
    fn notifications_enabled(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_reconnect: bool,
    pub max_messages: usize,
    pub notifications_enabled: bool,
    pub show_timestamps: bool,
    pub format_json_messages: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_messages: 1000,
            notifications_enabled: true,
            show_timestamps: true,
            format_json_messages: true,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        config_file(SETTINGS_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        read_toml(path)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        read_toml_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        write_toml(path, self)
    }
}

/// `name` inside the platform config directory of the application.
pub(crate) fn config_file(name: &str) -> Result<PathBuf, SettingsError> {
    let dirs = ProjectDirs::from("", "", "stompui").ok_or(SettingsError::NoConfigDir)?;
    Ok(dirs.config_dir().join(name))
}

pub(crate) fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_toml_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, SettingsError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "file missing, using defaults");
        return Ok(T::default());
    }
    read_toml(path)
}

pub(crate) fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), SettingsError> {
    let raw = toml::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, raw).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl SettingsProvider for Settings {
    fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    fn max_messages(&self) -> usize {
        self.max_messages
    }

    fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }
}

/// Settings shared between the UI, which edits them, and the session, which
/// reads them.
#[derive(Clone, Debug, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
    }

    pub fn reset(&self) {
        self.update(|settings| *settings = Settings::default());
    }

    fn read<T>(&self, get: impl FnOnce(&Settings) -> T) -> T {
        get(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SettingsProvider for SharedSettings {
    fn auto_reconnect(&self) -> bool {
        self.read(|settings| settings.auto_reconnect)
    }

    fn max_messages(&self) -> usize {
        self.read(|settings| settings.max_messages)
    }

    fn notifications_enabled(&self) -> bool {
        self.read(|settings| settings.notifications_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings: Settings = toml::from_str("max_messages = 3\nauto_reconnect = false\n").unwrap();
        assert_eq!(settings.max_messages, 3);
        assert!(!settings.auto_reconnect);
        assert!(settings.notifications_enabled);
        assert!(settings.format_json_messages);
    }

    #[test]
    fn save_then_load_through_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = Settings {
            max_messages: 42,
            notifications_enabled: false,
            ..Settings::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "max_messages = \"lots\"").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn shared_settings_changes_are_visible_to_clones() {
        let shared = SharedSettings::default();
        let reader = shared.clone();

        shared.update(|settings| settings.max_messages = 7);
        assert_eq!(reader.max_messages(), 7);

        shared.reset();
        assert_eq!(reader.max_messages(), 1000);
    }
}
