//! Settings consumed by the synthesis pipeline.
//!
//! [`PluginSettings`] is owned by the host: it is loaded once at startup,
//! updated when the user edits the settings, and persisted as a JSON document.
//! The pipeline only ever reads a snapshot of it.
//!
//! Sources, lowest priority first: defaults, the JSON settings file, then
//! environment variables (`ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID`, which may
//! come from a `.env` file loaded by the host).
//!
//! # Example
//! ```rust,no_run
//! use waav_speak::config::PluginSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = PluginSettings::default_path()?;
//! let settings = PluginSettings::load_or_default(&path).with_env_overrides();
//! println!("voice: {}", settings.voice_id);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Voice used when none is configured.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Environment variable overriding the API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Environment variable overriding the voice id.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

const SETTINGS_DIR: &str = "waav-speak";
const SETTINGS_FILE: &str = "settings.json";

/// Errors raised while reading or writing settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// API credentials and voice selection.
///
/// Either field may be blank; the synthesis client validates them before use.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: default_voice_id(),
        }
    }
}

/// Zeroize the API key when the settings are dropped.
impl Drop for PluginSettings {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

impl fmt::Debug for PluginSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSettings")
            .field("api_key", &self.masked_api_key())
            .field("voice_id", &self.voice_id)
            .finish()
    }
}

impl PluginSettings {
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: voice_id.into(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return "<not set>".to_string();
        }
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }

    /// Platform settings location, e.g. `~/.config/waav-speak/settings.json`.
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`PluginSettings::load`], but falls back to the defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Self::default()
        })
    }

    /// Writes the settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)?;

        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Applies `ELEVENLABS_API_KEY` / `ELEVENLABS_VOICE_ID` when they are set and non-blank.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = non_blank_env(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Some(voice) = non_blank_env(VOICE_ID_ENV) {
            self.voice_id = voice;
        }
        self
    }

    /// Applies an edit from the host's settings panel.
    ///
    /// `None` leaves a field untouched. A blank voice id resets to
    /// [`DEFAULT_VOICE_ID`]; a blank API key clears the key.
    pub fn apply_update(&mut self, api_key: Option<String>, voice_id: Option<String>) {
        if let Some(key) = api_key {
            self.api_key = key.trim().to_string();
        }
        if let Some(voice) = voice_id {
            let voice = voice.trim();
            self.voice_id = if voice.is_empty() {
                DEFAULT_VOICE_ID.to_string()
            } else {
                voice.to_string()
            };
        }
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = PluginSettings::default();
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.voice_id, DEFAULT_VOICE_ID);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let settings = PluginSettings::new("sk_test", "voice");
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json, serde_json::json!({"apiKey": "sk_test", "voiceId": "voice"}));

        let parsed: PluginSettings = serde_json::from_str(r#"{"apiKey": "k"}"#).unwrap();
        assert_eq!(parsed.api_key, "k");
        assert_eq!(parsed.voice_id, DEFAULT_VOICE_ID);
    }

    #[test]
    fn test_debug_masks_key() {
        let settings = PluginSettings::new("sk_1234567890abcd", "voice");
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk_1234567890"));
        assert!(debug.contains("abcd"));
        assert_eq!(PluginSettings::default().masked_api_key(), "<not set>");
        assert_eq!(PluginSettings::new("abc", "v").masked_api_key(), "***");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = PluginSettings::new("sk_saved", "voice-1");
        settings.save(&path).unwrap();

        let loaded = PluginSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PluginSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, PluginSettings::default());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            PluginSettings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(PluginSettings::load_or_default(&path), PluginSettings::default());
    }

    #[test]
    fn test_apply_update() {
        let mut settings = PluginSettings::new("old", "custom");
        settings.apply_update(None, Some("  ".to_string()));
        assert_eq!(settings.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(settings.api_key, "old");

        settings.apply_update(Some(" new ".to_string()), Some("other".to_string()));
        assert_eq!(settings.api_key, "new");
        assert_eq!(settings.voice_id, "other");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var(API_KEY_ENV, "sk_env");
            std::env::set_var(VOICE_ID_ENV, "  ");
        }

        let settings = PluginSettings::new("sk_file", "voice_file").with_env_overrides();
        assert_eq!(settings.api_key, "sk_env");
        assert_eq!(settings.voice_id, "voice_file");

        unsafe {
            std::env::remove_var(API_KEY_ENV);
            std::env::remove_var(VOICE_ID_ENV);
        }
    }
}
