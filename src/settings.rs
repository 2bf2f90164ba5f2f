//! Persistent user preferences.
//!
//! Preferences live in a JSON file, by default
//! `$XDG_CONFIG_HOME/xfce4-xr-desktop/config.json`.  The file is rewritten in
//! full (4-space indent) after every change.
//!
//! # Example
//!
//! ```json
//! {
//!     "display_distance": 1.05,
//!     "widescreen_mode": false,
//!     "follow_mode": true,
//!     "follow_threshold": 0.1,
//!     "keybindings": {
//!         "toggle_xr": "<Control><Super>backslash",
//!         "recenter": "<Control><Super>space",
//!         "toggle_distance": "<Control><Super>Return",
//!         "toggle_follow": "<Control><Super>f"
//!     }
//! }
//! ```
//!
//! Missing top-level keys are filled from the defaults when loading.  The
//! merge is **shallow**: a file that specifies only some keybindings replaces
//! the whole default `keybindings` map.  Values are not type- or
//! range-checked; the typed accessors fall back to defaults for values they
//! cannot interpret.

use crate::bridge::{BridgeState, DEFAULT_DISPLAY_DISTANCE, DEFAULT_FOLLOW_THRESHOLD};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Top-level keys of the settings document.
pub mod keys {
    pub const DISPLAY_DISTANCE: &str = "display_distance";
    pub const WIDESCREEN_MODE: &str = "widescreen_mode";
    pub const FOLLOW_MODE: &str = "follow_mode";
    pub const FOLLOW_THRESHOLD: &str = "follow_threshold";
    pub const KEYBINDINGS: &str = "keybindings";
}

/// Actions that carry a keybinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeybindingAction {
    ToggleXr,
    Recenter,
    ToggleDistance,
    ToggleFollow,
}

impl KeybindingAction {
    pub const ALL: [KeybindingAction; 4] = [
        KeybindingAction::ToggleXr,
        KeybindingAction::Recenter,
        KeybindingAction::ToggleDistance,
        KeybindingAction::ToggleFollow,
    ];

    /// Key inside the `keybindings` map.
    pub fn as_str(self) -> &'static str {
        match self {
            KeybindingAction::ToggleXr => "toggle_xr",
            KeybindingAction::Recenter => "recenter",
            KeybindingAction::ToggleDistance => "toggle_distance",
            KeybindingAction::ToggleFollow => "toggle_follow",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            KeybindingAction::ToggleXr => "Toggle XR",
            KeybindingAction::Recenter => "Recenter Display",
            KeybindingAction::ToggleDistance => "Toggle Distance",
            KeybindingAction::ToggleFollow => "Toggle Follow",
        }
    }

    /// Accelerator used when nothing is configured.
    pub fn default_accelerator(self) -> &'static str {
        match self {
            KeybindingAction::ToggleXr => "<Control><Super>backslash",
            KeybindingAction::Recenter => "<Control><Super>space",
            KeybindingAction::ToggleDistance => "<Control><Super>Return",
            KeybindingAction::ToggleFollow => "<Control><Super>f",
        }
    }
}

/// Error from loading or saving the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{}: top-level value is not an object", .path.display())]
    NotAnObject { path: PathBuf },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The compiled-in settings document.
pub fn default_document() -> Map<String, Value> {
    let defaults = BridgeState::default();

    let mut keybindings = Map::new();
    for action in KeybindingAction::ALL {
        keybindings.insert(
            action.as_str().to_string(),
            Value::from(action.default_accelerator()),
        );
    }

    let mut doc = Map::new();
    doc.insert(keys::DISPLAY_DISTANCE.into(), Value::from(defaults.display_distance));
    doc.insert(keys::WIDESCREEN_MODE.into(), Value::from(defaults.widescreen_mode));
    doc.insert(keys::FOLLOW_MODE.into(), Value::from(defaults.follow_mode));
    doc.insert(keys::FOLLOW_THRESHOLD.into(), Value::from(defaults.follow_threshold));
    doc.insert(keys::KEYBINDINGS.into(), Value::Object(keybindings));
    doc
}

/// JSON-backed settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl SettingsStore {
    /// Load settings from `path`, never failing.
    ///
    /// Any error is logged and an in-memory copy of the defaults is
    /// returned; the file on disk is left untouched in that case.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(store) => store,
            Err(e) => {
                error!("error loading settings: {}", e);
                Self::in_memory(path)
            }
        }
    }

    /// Load settings from `path`.
    ///
    /// Creates the parent directory if needed.  If the file does not exist
    /// the defaults are written to it and returned.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| SettingsError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no settings at {}, writing defaults", path.display());
                let store = Self::in_memory(path);
                store.save()?;
                return Ok(store);
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let loaded: Value = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(loaded) = loaded else {
            return Err(SettingsError::NotAnObject {
                path: path.to_path_buf(),
            });
        };

        let mut doc = default_document();
        for (key, value) in loaded {
            doc.insert(key, value);
        }
        debug!("loaded settings from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// A store holding the defaults that has not touched the filesystem.
    pub fn in_memory(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            doc: default_document(),
        }
    }

    /// Where the settings are persisted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full settings document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Raw value for a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Set a top-level key and persist the whole document.
    ///
    /// The in-memory value is updated even if the write fails.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        self.doc.insert(key.to_string(), value.into());
        self.persist()
    }

    /// Accelerator bound to `action`, if any.
    pub fn keybinding(&self, action: &str) -> Option<&str> {
        self.doc
            .get(keys::KEYBINDINGS)?
            .as_object()?
            .get(action)?
            .as_str()
    }

    /// Bind `action` to `accelerator` and persist the whole document.
    ///
    /// A missing or non-object `keybindings` entry is replaced by a fresh map.
    pub fn set_keybinding(&mut self, action: &str, accelerator: &str) -> Result<(), SettingsError> {
        let entry = self
            .doc
            .entry(keys::KEYBINDINGS)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            warn!("keybindings entry is not an object, replacing it");
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(action.to_string(), Value::from(accelerator));
        }
        self.persist()
    }

    //  Typed accessors

    pub fn display_distance(&self) -> f64 {
        self.f64_or(keys::DISPLAY_DISTANCE, DEFAULT_DISPLAY_DISTANCE)
    }

    pub fn set_display_distance(&mut self, meters: f64) -> Result<(), SettingsError> {
        self.set(keys::DISPLAY_DISTANCE, meters)
    }

    pub fn widescreen_mode(&self) -> bool {
        self.bool_or(keys::WIDESCREEN_MODE, false)
    }

    pub fn set_widescreen_mode(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.set(keys::WIDESCREEN_MODE, enabled)
    }

    pub fn follow_mode(&self) -> bool {
        self.bool_or(keys::FOLLOW_MODE, true)
    }

    pub fn set_follow_mode(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.set(keys::FOLLOW_MODE, enabled)
    }

    pub fn follow_threshold(&self) -> f64 {
        self.f64_or(keys::FOLLOW_THRESHOLD, DEFAULT_FOLLOW_THRESHOLD)
    }

    pub fn set_follow_threshold(&mut self, radians: f64) -> Result<(), SettingsError> {
        self.set(keys::FOLLOW_THRESHOLD, radians)
    }

    /// The persisted scalars in the shape the bridge mirrors to the driver.
    pub fn bridge_state(&self) -> BridgeState {
        BridgeState {
            display_distance: self.display_distance(),
            widescreen_mode: self.widescreen_mode(),
            follow_mode: self.follow_mode(),
            follow_threshold: self.follow_threshold(),
        }
    }

    //  Persistence

    /// Rewrite the settings file from the in-memory document.
    pub fn save(&self) -> Result<(), SettingsError> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.doc.serialize(&mut ser)?;
        std::fs::write(&self.path, buf).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self) -> Result<(), SettingsError> {
        self.save().map_err(|e| {
            error!("error saving settings: {}", e);
            e
        })
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        match self.doc.get(key) {
            Some(v) => v.as_f64().unwrap_or_else(|| {
                warn!("{} is not a number ({}), using {}", key, v, default);
                default
            }),
            None => default,
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.doc.get(key) {
            Some(v) => v.as_bool().unwrap_or_else(|| {
                warn!("{} is not a boolean ({}), using {}", key, v, default);
                default
            }),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::test_support::scratch_dir;
    use serde_json::json;

    /// Path to `config.json` inside an existing, empty config directory.
    fn config_path(tag: &str) -> PathBuf {
        let dir = scratch_dir(tag).join("xfce4-xr-desktop");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("config.json")
    }

    #[test]
    fn absent_directory_is_created() {
        let path = scratch_dir("settings-mkdir")
            .join("nested")
            .join("xfce4-xr-desktop")
            .join("config.json");
        SettingsStore::try_load(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn absent_file_writes_defaults() {
        let path = config_path("settings-absent");
        let store = SettingsStore::try_load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.document(), &default_document());

        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, Value::Object(default_document()));
    }

    #[test]
    fn file_uses_four_space_indent() {
        let path = config_path("settings-indent");
        SettingsStore::try_load(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"display_distance\": 1.05"));
        assert!(text.contains("\n        \"toggle_xr\": \"<Control><Super>backslash\""));
    }

    /// Byte offset of `"key"` in `text`.
    fn key_offset(text: &str, key: &str) -> usize {
        text.find(&format!("\"{}\"", key))
            .unwrap_or_else(|| panic!("{} missing from {}", key, text))
    }

    #[test]
    fn file_keeps_default_key_order() {
        let path = config_path("settings-order");
        let mut store = SettingsStore::try_load(&path).unwrap();
        store.set_follow_threshold(0.2).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let top: Vec<usize> = default_document()
            .keys()
            .map(|k| key_offset(&text, k))
            .collect();
        assert!(top.windows(2).all(|w| w[0] < w[1]), "{}", text);

        let actions: Vec<usize> = KeybindingAction::ALL
            .iter()
            .map(|a| key_offset(&text, a.as_str()))
            .collect();
        assert!(actions.windows(2).all(|w| w[0] < w[1]), "{}", text);
    }

    #[test]
    fn hand_edited_order_survives_save() {
        let path = config_path("settings-hand-order");
        std::fs::write(
            &path,
            r#"{ "zeta": 1, "follow_mode": false, "alpha": 2, "display_distance": 2.0 }"#,
        )
        .unwrap();
        let mut store = SettingsStore::try_load(&path).unwrap();
        store.set_display_distance(2.5).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(key_offset(&text, "zeta") < key_offset(&text, "alpha"), "{}", text);
    }

    #[test]
    fn missing_key_filled_from_defaults() {
        let path = config_path("settings-missing-key");
        std::fs::write(
            &path,
            r#"{ "display_distance": 2.5, "widescreen_mode": true, "follow_mode": false,
                 "keybindings": { "toggle_xr": "a", "recenter": "b",
                                  "toggle_distance": "c", "toggle_follow": "d" } }"#,
        )
        .unwrap();
        let store = SettingsStore::try_load(&path).unwrap();
        assert_eq!(store.display_distance(), 2.5);
        assert!(store.widescreen_mode());
        assert!(!store.follow_mode());
        assert_eq!(store.get(keys::FOLLOW_THRESHOLD), Some(&json!(0.1)));
    }

    #[test]
    fn partial_keybindings_replace_defaults() {
        let path = config_path("settings-partial-kb");
        std::fs::write(&path, r#"{ "keybindings": { "recenter": "<Alt>r" } }"#).unwrap();
        let store = SettingsStore::try_load(&path).unwrap();
        assert_eq!(store.get(keys::KEYBINDINGS), Some(&json!({ "recenter": "<Alt>r" })));
        assert_eq!(store.keybinding("recenter"), Some("<Alt>r"));
        assert_eq!(store.keybinding("toggle_xr"), None);
    }

    #[test]
    fn unknown_keys_preserved() {
        let path = config_path("settings-unknown");
        std::fs::write(&path, r#"{ "future_section": { "key": 42 } }"#).unwrap();
        let mut store = SettingsStore::try_load(&path).unwrap();
        store.set_follow_mode(false).unwrap();
        let reloaded = SettingsStore::try_load(&path).unwrap();
        assert_eq!(reloaded.get("future_section"), Some(&json!({ "key": 42 })));
    }

    #[test]
    fn set_then_reload_round_trips() {
        let path = config_path("settings-roundtrip");
        let mut store = SettingsStore::load(&path);
        store.set_display_distance(1.75).unwrap();
        store.set_widescreen_mode(true).unwrap();
        store.set_follow_threshold(0.33).unwrap();
        store.set("custom", "value").unwrap();

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.display_distance(), 1.75);
        assert!(reloaded.widescreen_mode());
        assert_eq!(reloaded.follow_threshold(), 0.33);
        assert_eq!(reloaded.get("custom"), Some(&json!("value")));
    }

    #[test]
    fn set_keybinding_persists() {
        let path = config_path("settings-keybinding");
        let mut store = SettingsStore::load(&path);
        store.set_keybinding("recenter", "<Super>c").unwrap();
        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.keybinding("recenter"), Some("<Super>c"));
        assert_eq!(
            reloaded.keybinding("toggle_follow"),
            Some("<Control><Super>f")
        );
    }

    #[test]
    fn set_keybinding_repairs_non_object() {
        let path = config_path("settings-kb-repair");
        std::fs::write(&path, r#"{ "keybindings": "oops" }"#).unwrap();
        let mut store = SettingsStore::try_load(&path).unwrap();
        assert_eq!(store.keybinding("recenter"), None);
        store.set_keybinding("recenter", "<Super>c").unwrap();
        assert_eq!(store.get(keys::KEYBINDINGS), Some(&json!({ "recenter": "<Super>c" })));
    }

    #[test]
    fn malformed_json_falls_back_without_touching_disk() {
        let path = config_path("settings-malformed");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SettingsStore::try_load(&path),
            Err(SettingsError::Parse { .. })
        ));

        let store = SettingsStore::load(&path);
        assert_eq!(store.document(), &default_document());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn non_object_document_is_rejected() {
        let path = config_path("settings-array");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            SettingsStore::try_load(&path),
            Err(SettingsError::NotAnObject { .. })
        ));
    }

    #[test]
    fn mistyped_values_read_as_defaults() {
        let path = config_path("settings-mistyped");
        std::fs::write(
            &path,
            r#"{ "display_distance": "far", "follow_mode": 1, "follow_threshold": 9.0 }"#,
        )
        .unwrap();
        let store = SettingsStore::try_load(&path).unwrap();
        assert_eq!(store.display_distance(), DEFAULT_DISPLAY_DISTANCE);
        assert!(store.follow_mode());
        // Out-of-range values are kept as-is.
        assert_eq!(store.follow_threshold(), 9.0);
    }

    #[test]
    fn bridge_state_projects_scalars() {
        let path = config_path("settings-bridge");
        std::fs::write(
            &path,
            r#"{ "display_distance": 0.8, "widescreen_mode": true, "follow_mode": false, "follow_threshold": 0.2 }"#,
        )
        .unwrap();
        let store = SettingsStore::try_load(&path).unwrap();
        assert_eq!(
            store.bridge_state(),
            BridgeState {
                display_distance: 0.8,
                widescreen_mode: true,
                follow_mode: false,
                follow_threshold: 0.2,
            }
        );
    }

    #[test]
    fn keybinding_actions_match_defaults() {
        let store = SettingsStore::in_memory("/nonexistent/config.json");
        for action in KeybindingAction::ALL {
            assert_eq!(
                store.keybinding(action.as_str()),
                Some(action.default_accelerator())
            );
        }
    }
}
