//! Shell configuration
//!
//! The orchestration core only ever reads configuration. Writes happen through
//! [`ConfigStore::update`], used by the settings and license surfaces of the app.

use crate::error::{MailwaveError, MailwaveResult};
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MAILWAVE_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.json";
const USER_STYLESHEET_NAME: &str = "user.css";

/// Shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Configured accounts, in display order
    pub accounts: Vec<AccountConfig>,

    /// Account shown at startup
    pub selected_account: Option<AccountId>,

    /// Check for updates in the background
    pub auto_update: bool,

    /// Let companion applications (calendar, chat...) show notifications
    pub notifications_from_companion_apps: bool,

    /// Mail application UI tweaks
    pub ui: UiConfig,

    /// Who picks the source of a screen share
    pub screen_share_picker: ScreenSharePickerMode,

    /// Root of the per-account storage partitions
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: AccountId,

    /// Label shown in the account switcher
    pub label: String,

    /// Track the unread count of this account for the badge
    #[serde(default = "default_true")]
    pub unread_badge: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub hide_logo: bool,
    pub hide_footer: bool,
    /// Newest message first in conversations. Licensed feature.
    pub reverse_conversation: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenSharePickerMode {
    /// Shell-provided picker window
    #[default]
    Shell,
    /// Leave the choice to the webview engine
    System,
}

fn default_true() -> bool {
    true
}

impl AccountConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            label: label.into(),
            unread_badge: true,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            accounts: vec![AccountConfig::new("default", "Default")],
            selected_account: None,
            auto_update: true,
            notifications_from_companion_apps: true,
            ui: UiConfig::default(),
            screen_share_picker: ScreenSharePickerMode::default(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailwave"),
        }
    }
}

impl ShellConfig {
    pub fn account(&self, id: &AccountId) -> Option<&AccountConfig> {
        self.accounts.iter().find(|account| &account.id == id)
    }

    /// The selected account, falling back to the first configured one
    pub fn initial_account(&self) -> Option<&AccountConfig> {
        self.selected_account
            .as_ref()
            .and_then(|id| self.account(id))
            .or_else(|| self.accounts.first())
    }
}

/// Directory holding `config.json` and the user stylesheet
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailwave")
}

/// Location of the persisted user stylesheet
pub fn user_stylesheet_path() -> PathBuf {
    config_dir().join(USER_STYLESHEET_NAME)
}

/// Loads, holds and persists the [`ShellConfig`]
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: RwLock<ShellConfig>,
}

impl ConfigStore {
    /// Store that is never written to disk
    pub fn in_memory(config: ShellConfig) -> Self {
        Self {
            path: None,
            config: RwLock::new(config),
        }
    }

    /// Load the configuration from `path`
    pub fn load(path: impl Into<PathBuf>) -> MailwaveResult<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        let config: ShellConfig = serde_json::from_str(&contents)?;
        validate(&config)?;

        log::info!(
            "Loaded configuration from {:?} ({} accounts)",
            path,
            config.accounts.len()
        );

        Ok(Self {
            path: Some(path),
            config: RwLock::new(config),
        })
    }

    /// Load the configuration from `path`, or start from defaults when the
    /// file does not exist yet
    pub fn load_or_default(path: impl Into<PathBuf>) -> MailwaveResult<Self> {
        let path = path.into();
        if path.exists() {
            return Self::load(path);
        }

        log::info!("No configuration at {:?}, using defaults", path);
        Ok(Self {
            path: Some(path),
            config: RwLock::new(ShellConfig::default()),
        })
    }

    /// Default store location under [`config_dir`]
    pub fn default_path() -> PathBuf {
        config_dir().join(CONFIG_FILE_NAME)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> ShellConfig {
        self.read(|config| config.clone())
    }

    /// Read a value out of the current configuration
    pub fn read<T>(&self, f: impl FnOnce(&ShellConfig) -> T) -> T {
        let guard = self.config.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Modify the configuration and persist it
    pub fn update(&self, f: impl FnOnce(&mut ShellConfig)) -> MailwaveResult<()> {
        {
            let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
            f(&mut guard);
            validate(&guard)?;
        }
        self.save()
    }

    /// Persist the configuration as pretty JSON. In-memory stores are a no-op.
    pub fn save(&self) -> MailwaveResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = self.read(|config| serde_json::to_string_pretty(config))?;
        fs::write(path, json)?;
        log::debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn notifications_from_companion_apps(&self) -> bool {
        self.read(|config| config.notifications_from_companion_apps)
    }

    pub fn screen_share_picker(&self) -> ScreenSharePickerMode {
        self.read(|config| config.screen_share_picker)
    }

    pub fn ui(&self) -> UiConfig {
        self.read(|config| config.ui.clone())
    }

    pub fn auto_update(&self) -> bool {
        self.read(|config| config.auto_update)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.read(|config| config.data_dir.clone())
    }
}

fn validate(config: &ShellConfig) -> MailwaveResult<()> {
    let mut seen = std::collections::HashSet::new();
    for account in &config.accounts {
        if account.id.as_str().is_empty() {
            return Err(MailwaveError::config("account id must not be empty"));
        }
        if !seen.insert(&account.id) {
            return Err(MailwaveError::config(format!(
                "duplicate account id '{}'",
                account.id
            )));
        }
    }
    if let Some(selected) = &config.selected_account {
        if config.account(selected).is_none() {
            return Err(MailwaveError::config(format!(
                "selected account '{}' is not configured",
                selected
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::load_or_default(dir.path().join("config.json")).unwrap();
        let config = store.snapshot();
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.screen_share_picker, ScreenSharePickerMode::Shell);
        assert!(config.notifications_from_companion_apps);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "accounts": [{ "id": "work", "label": "Work", "unread_badge": false }],
                "ui": { "hide_footer": true },
                "screen_share_picker": "system"
            }"#,
        )
        .unwrap();

        let store = ConfigStore::load(&path).unwrap();
        let config = store.snapshot();
        assert_eq!(config.accounts[0].id, AccountId::new("work"));
        assert!(!config.accounts[0].unread_badge);
        assert!(config.ui.hide_footer);
        assert!(!config.ui.hide_logo);
        assert_eq!(store.screen_share_picker(), ScreenSharePickerMode::System);
        assert!(store.auto_update());
    }

    #[test]
    fn test_update_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::load_or_default(&path).unwrap();

        store
            .update(|config| config.notifications_from_companion_apps = false)
            .unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert!(!reloaded.notifications_from_companion_apps());
    }

    #[test]
    fn test_duplicate_accounts_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "accounts": [{ "id": "a", "label": "A" }, { "id": "a", "label": "B" }] }"#,
        )
        .unwrap();

        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, MailwaveError::Config(_)));
    }

    #[test]
    fn test_initial_account_falls_back_to_first() {
        let mut config = ShellConfig::default();
        config.accounts = vec![AccountConfig::new("a", "A"), AccountConfig::new("b", "B")];
        assert_eq!(config.initial_account().unwrap().id.as_str(), "a");

        config.selected_account = Some(AccountId::new("b"));
        assert_eq!(config.initial_account().unwrap().id.as_str(), "b");
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let store = ConfigStore::in_memory(ShellConfig::default());
        store.update(|config| config.auto_update = false).unwrap();
        assert!(store.path().is_none());
        assert!(!store.auto_update());
    }
}
