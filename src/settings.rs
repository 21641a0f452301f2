use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tokio::sync::watch;

use crate::explanation::openrouter::{ModelInfo, DEFAULT_MODEL};
use crate::explanation::prompt::default_prompt;
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// File name of the settings document inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub is_enabled: bool,
    pub openrouter_api_key: String,
    pub model: String,
    pub prompt: String,
    pub cached_models: Vec<ModelInfo>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            is_enabled: true,
            openrouter_api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            prompt: default_prompt(&system_locale()).into(),
            cached_models: Vec::new(),
        }
    }
}

/// UI language from the usual POSIX locale variables, `"en"` when unset.
pub fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
        .unwrap_or_else(|| "en".into())
}

/// JSON-backed settings with change notification.
///
/// Readers get a snapshot; writers persist first and then publish the new
/// value to every [`subscribe`](Self::subscribe)r.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
    notifier: watch::Sender<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        let (notifier, _) = watch::channel(data.clone());
        Ok(Self {
            path,
            data: RwLock::new(data),
            notifier,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserSettings> {
        self.notifier.subscribe()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        {
            let mut guard = self.write();
            self.persist(&settings)?;
            *guard = settings.clone();
        }
        self.notifier.send_replace(settings);
        Ok(())
    }

    /// Apply `change` to the current settings and save the result.
    pub fn modify<F>(&self, change: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let updated = {
            let mut guard = self.write();
            let mut next = guard.clone();
            change(&mut next);
            self.persist(&next)?;
            *guard = next.clone();
            next
        };
        self.notifier.send_replace(updated.clone());
        Ok(updated)
    }

    /// Re-read the file, e.g. after another process changed it.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        *self.write() = data.clone();
        self.notifier.send_replace(data);
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE)).unwrap();
        let settings = store.get();
        assert!(settings.is_enabled);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert!(settings.prompt.contains("{word}"));
        assert!(settings.openrouter_api_key.is_empty());
    }

    #[test]
    fn update_persists_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .modify(|settings| {
                settings.openrouter_api_key = "sk-1".into();
                settings.is_enabled = false;
            })
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"openrouterApiKey\": \"sk-1\""));

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.get().openrouter_api_key, "sk-1");
        assert!(!reopened.get().is_enabled);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"model":"custom/model"}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.get();
        assert_eq!(settings.model, "custom/model");
        assert!(settings.is_enabled);
    }

    #[tokio::test]
    async fn subscribers_see_updates_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut rx = store.subscribe();

        store
            .modify(|settings| settings.model = "a/b".into())
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().model, "a/b");

        let mut edited = store.get();
        edited.prompt = "{word}?".into();
        fs::write(&path, serde_json::to_string(&edited).unwrap()).unwrap();
        store.reload().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().prompt, "{word}?");
    }
}
