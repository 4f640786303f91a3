use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use codemirror_editor::{EditorCall, Language, Theme};

use crate::state::ConfigField;

/// The independently toggleable editor properties a host binds to.
///
/// Missing keys in a serialized configuration are filled from `Default`, so
/// older settings files keep loading as fields are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfiguration {
    pub line_wrapping: bool,
    pub line_numbers: bool,
    pub fold_gutter: bool,
    pub read_only: bool,
    pub highlight_active_line: bool,
    pub search_enabled: bool,
    pub language: Language,
    pub theme: Theme,
    pub placeholder: String,
    pub font_size: f64,
    pub focused: bool,
}

impl Default for EditorConfiguration {
    fn default() -> Self {
        EditorConfiguration {
            line_wrapping: false,
            line_numbers: true,
            fold_gutter: false,
            read_only: false,
            highlight_active_line: true,
            search_enabled: false,
            language: Language::Json,
            theme: Theme::VscodeDark,
            placeholder: String::new(),
            font_size: 14.0,
            focused: false,
        }
    }
}

impl EditorConfiguration {
    /// Every field paired with its comparable value and the call that
    /// applies it, in dispatch order.
    pub fn entries(&self) -> Vec<(ConfigField, Value, EditorCall)> {
        let focus_call = if self.focused {
            EditorCall::SetFocus
        } else {
            EditorCall::SetBlur
        };
        vec![
            (
                ConfigField::Theme,
                Value::from(self.theme.id()),
                EditorCall::SetTheme(self.theme),
            ),
            (
                ConfigField::LineWrapping,
                Value::from(self.line_wrapping),
                EditorCall::SetLineWrapping(self.line_wrapping),
            ),
            (
                ConfigField::LineNumbers,
                Value::from(self.line_numbers),
                EditorCall::SetLineNumber(self.line_numbers),
            ),
            (
                ConfigField::FoldGutter,
                Value::from(self.fold_gutter),
                EditorCall::SetFoldGutter(self.fold_gutter),
            ),
            (
                ConfigField::ReadOnly,
                Value::from(self.read_only),
                EditorCall::SetReadOnly(self.read_only),
            ),
            (
                ConfigField::HighlightActiveLine,
                Value::from(self.highlight_active_line),
                EditorCall::SetHighlightActiveLine(self.highlight_active_line),
            ),
            (
                ConfigField::SearchEnabled,
                Value::from(self.search_enabled),
                EditorCall::SetEnabledSearch(self.search_enabled),
            ),
            (
                ConfigField::Language,
                Value::from(self.language.id()),
                EditorCall::SetLanguage(self.language),
            ),
            (
                ConfigField::Placeholder,
                Value::from(self.placeholder.as_str()),
                EditorCall::SetPlaceholder(self.placeholder.clone()),
            ),
            (
                ConfigField::FontSize,
                Value::from(self.font_size),
                EditorCall::SetFontSize(self.font_size),
            ),
            (ConfigField::Focused, Value::from(self.focused), focus_call),
        ]
    }
}

/// Bridge tuning plus the editor configuration a new bridge starts from,
/// persisted to `<config dir>/codemirror-bridge/settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeSettings {
    /// Window in which successive host content writes coalesce into one.
    pub content_debounce_ms: u64,
    /// Spacing between queued calls flushed once the runtime is ready.
    /// Zero flushes the whole queue at once.
    pub flush_interval_ms: u64,
    pub editor: EditorConfiguration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        BridgeSettings {
            content_debounce_ms: 50,
            flush_interval_ms: 1,
            editor: EditorConfiguration::default(),
        }
    }
}

impl BridgeSettings {
    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

pub fn settings_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(
                PathBuf::from(xdg)
                    .join("codemirror-bridge")
                    .join("settings.json"),
            );
        }
    }
    dirs::config_dir().map(|dir| dir.join("codemirror-bridge").join("settings.json"))
}

/// Load settings from the default location, falling back to defaults.
pub fn load() -> BridgeSettings {
    match settings_path() {
        Some(path) => load_from(&path),
        None => BridgeSettings::default(),
    }
}

pub fn load_from(path: &Path) -> BridgeSettings {
    let contents = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return BridgeSettings::default(),
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Invalid bridge settings at {}: {}", path.display(), e);
            BridgeSettings::default()
        }
    }
}

pub fn save(settings: &BridgeSettings) -> Result<(), String> {
    let path = settings_path().ok_or_else(|| "Cannot determine config directory".to_string())?;
    save_to(settings, &path)
}

pub fn save_to(settings: &BridgeSettings, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}
