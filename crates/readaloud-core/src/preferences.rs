//! User preferences domain types and validation.
//!
//! One process-wide record. The core only reads it when creating sessions
//! (default speed, volume and voice) and writes the enable toggle.

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, ReaderResult};
use crate::session::{DEFAULT_SPEED, DEFAULT_VOLUME, MAX_SPEED, MAX_VOLUME, MIN_SPEED, MIN_VOLUME};

/// Corner of the viewport the playback overlay sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

/// Keyboard shortcut bindings, as accelerator strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyboardShortcuts {
    pub play_pause: String,
    pub stop: String,
    pub speed_up: String,
    pub speed_down: String,
}

impl Default for KeyboardShortcuts {
    fn default() -> Self {
        Self {
            play_pause: "Alt+Shift+P".to_string(),
            stop: "Alt+Shift+S".to_string(),
            speed_up: "Alt+Shift+Up".to_string(),
            speed_down: "Alt+Shift+Down".to_string(),
        }
    }
}

/// User preferences.
///
/// Missing fields deserialize to their defaults so older stored records
/// keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    /// Master toggle. Starts are refused while off.
    pub enabled: bool,
    pub default_speed: f32,
    pub default_volume: f32,
    pub auto_start: bool,
    pub pause_on_tab_switch: bool,
    pub highlight_current_word: bool,
    pub show_progress: bool,
    pub overlay_position: OverlayPosition,
    pub theme: Theme,
    /// Preferred voice id, if any.
    pub voice: Option<String>,
    /// Preferred BCP 47 language tag, if any.
    pub language: Option<String>,
    pub shortcuts: KeyboardShortcuts,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            default_speed: DEFAULT_SPEED,
            default_volume: DEFAULT_VOLUME,
            auto_start: false,
            pause_on_tab_switch: true,
            highlight_current_word: true,
            show_progress: true,
            overlay_position: OverlayPosition::default(),
            theme: Theme::default(),
            voice: None,
            language: None,
            shortcuts: KeyboardShortcuts::default(),
        }
    }
}

impl UserPreferences {
    /// Apply a partial update, only touching fields that are `Some`.
    pub fn merge(&mut self, update: &PreferencesUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(speed) = update.default_speed {
            self.default_speed = speed;
        }
        if let Some(volume) = update.default_volume {
            self.default_volume = volume;
        }
        if let Some(auto_start) = update.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(pause) = update.pause_on_tab_switch {
            self.pause_on_tab_switch = pause;
        }
        if let Some(highlight) = update.highlight_current_word {
            self.highlight_current_word = highlight;
        }
        if let Some(show) = update.show_progress {
            self.show_progress = show;
        }
        if let Some(position) = update.overlay_position {
            self.overlay_position = position;
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(ref voice) = update.voice {
            self.voice.clone_from(voice);
        }
        if let Some(ref language) = update.language {
            self.language.clone_from(language);
        }
        if let Some(ref shortcuts) = update.shortcuts {
            self.shortcuts.clone_from(shortcuts);
        }
    }
}

/// Partial preferences update.
///
/// `voice` and `language` are `Option<Option<T>>`: `None` leaves the field
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub enabled: Option<bool>,
    pub default_speed: Option<f32>,
    pub default_volume: Option<f32>,
    pub auto_start: Option<bool>,
    pub pause_on_tab_switch: Option<bool>,
    pub highlight_current_word: Option<bool>,
    pub show_progress: Option<bool>,
    pub overlay_position: Option<OverlayPosition>,
    pub theme: Option<Theme>,
    pub voice: Option<Option<String>>,
    pub language: Option<Option<String>>,
    pub shortcuts: Option<KeyboardShortcuts>,
}

/// Reject preferences whose defaults would fail session validation.
pub fn validate_preferences(preferences: &UserPreferences) -> ReaderResult<()> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&preferences.default_speed) {
        return Err(ReaderError::invalid_parameter(
            "defaultSpeed",
            preferences.default_speed,
            format!("must be between {MIN_SPEED} and {MAX_SPEED}"),
        ));
    }
    if !(MIN_VOLUME..=MAX_VOLUME).contains(&preferences.default_volume) {
        return Err(ReaderError::invalid_parameter(
            "defaultVolume",
            preferences.default_volume,
            format!("must be between {MIN_VOLUME} and {MAX_VOLUME}"),
        ));
    }
    if preferences
        .language
        .as_ref()
        .is_some_and(|lang| lang.trim().is_empty())
    {
        return Err(ReaderError::invalid_parameter(
            "language",
            "",
            "must not be blank",
        ));
    }
    Ok(())
}
