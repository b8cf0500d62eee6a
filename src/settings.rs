//! Global preferences shared by every pad
//!
//! One `Settings` value exists per process. It is handed to each pad as a
//! `SharedSettings` handle; pads that need to react to changes subscribe and
//! drain their receiver from the event loop.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::color::Rgb16;
use crate::pad::toolbar::ToolbarPolicy;

pub type SharedSettings = Rc<RefCell<Settings>>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write settings to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// A single preference that changed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    HasToolbar(bool),
    AutohideToolbar(bool),
    HasScrollbar(bool),
    HasDecorations(bool),
    Sticky(bool),
    EditLock(bool),
    ConfirmDestroy(bool),
    Fontname(Option<String>),
    TextColor(Rgb16),
    BackColor(Rgb16),
}

/// Persisted preference values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_true")]
    pub has_toolbar: bool,
    #[serde(default = "default_true")]
    pub autohide_toolbar: bool,
    #[serde(default)]
    pub has_scrollbar: bool,
    #[serde(default = "default_true")]
    pub has_decorations: bool,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub edit_lock: bool,
    #[serde(default = "default_true")]
    pub confirm_destroy: bool,
    /// None means the desktop's default font
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fontname: Option<String>,
    #[serde(default = "default_text_color")]
    pub text_color: Rgb16,
    #[serde(default = "default_back_color")]
    pub back_color: Rgb16,
}

fn default_true() -> bool {
    true
}

fn default_text_color() -> Rgb16 {
    Rgb16::new(0, 0, 0)
}

fn default_back_color() -> Rgb16 {
    Rgb16::from_rgb8(0xff, 0xee, 0xaa)
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            has_toolbar: true,
            autohide_toolbar: true,
            has_scrollbar: false,
            has_decorations: true,
            sticky: false,
            edit_lock: false,
            confirm_destroy: true,
            fontname: None,
            text_color: default_text_color(),
            back_color: default_back_color(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Settings {
    prefs: Preferences,
    subscribers: Vec<Sender<SettingChange>>,
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty, $variant:ident) => {
        pub fn $name(&mut self, value: $ty) {
            if self.prefs.$field != value {
                self.prefs.$field = value.clone();
                self.publish(SettingChange::$variant(value));
            }
        }
    };
}

impl Settings {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            subscribers: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedSettings {
        Rc::new(RefCell::new(self))
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::SETTINGS_FILENAME);
        path
    }

    /// Load settings from JSON, writing defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "settings file not found, writing defaults");
                let settings = Settings::default();
                settings.save(path)?;
                return Ok(settings);
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let prefs = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded settings");
        Ok(Self::new(prefs))
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(&self.prefs)
            .map_err(|e| write_err(io::Error::other(e)))?;
        fs::write(path, json).map_err(write_err)?;
        debug!(path = %path.display(), "saved settings");
        Ok(())
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn toolbar_policy(&self) -> ToolbarPolicy {
        ToolbarPolicy {
            has_toolbar: self.prefs.has_toolbar,
            autohide: self.prefs.autohide_toolbar,
        }
    }

    /// Register for change notifications
    pub fn subscribe(&mut self) -> Receiver<SettingChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, change: SettingChange) {
        debug!(change = ?change, subscribers = self.subscribers.len(), "setting changed");
        // Receivers of closed pads are gone; drop their senders
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    setter!(set_has_toolbar, has_toolbar, bool, HasToolbar);
    setter!(set_autohide_toolbar, autohide_toolbar, bool, AutohideToolbar);
    setter!(set_has_scrollbar, has_scrollbar, bool, HasScrollbar);
    setter!(set_has_decorations, has_decorations, bool, HasDecorations);
    setter!(set_sticky, sticky, bool, Sticky);
    setter!(set_edit_lock, edit_lock, bool, EditLock);
    setter!(set_confirm_destroy, confirm_destroy, bool, ConfirmDestroy);
    setter!(set_fontname, fontname, Option<String>, Fontname);
    setter!(set_text_color, text_color, Rgb16, TextColor);
    setter!(set_back_color, back_color, Rgb16, BackColor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_subscribers_receive_changes() {
        let mut settings = Settings::default();
        let rx_a = settings.subscribe();
        let rx_b = settings.subscribe();

        settings.set_autohide_toolbar(false);
        settings.set_fontname(Some("Serif 10".to_string()));

        for rx in [&rx_a, &rx_b] {
            assert_eq!(rx.try_recv().unwrap(), SettingChange::AutohideToolbar(false));
            assert_eq!(
                rx.try_recv().unwrap(),
                SettingChange::Fontname(Some("Serif 10".to_string()))
            );
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_unchanged_value_is_not_published() {
        let mut settings = Settings::default();
        let rx = settings.subscribe();
        settings.set_has_toolbar(true);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut settings = Settings::default();
        let rx = settings.subscribe();
        drop(rx);
        settings.set_sticky(true);
        assert!(settings.subscribers.is_empty());
        assert!(settings.prefs().sticky);
    }

    #[test]
    fn test_load_missing_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("xpad").join("settings.json");
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.prefs(), &Preferences::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.set_back_color(Rgb16::from_rgb8(0x12, 0x34, 0x56));
        settings.set_edit_lock(true);
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.prefs(), settings.prefs());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "autohide_toolbar": false }"#).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert!(!loaded.prefs().autohide_toolbar);
        assert!(loaded.prefs().has_toolbar);
        assert_eq!(loaded.prefs().back_color, default_back_color());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }
}
