/// User-tunable settings
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/memory-orbs/settings.json
/// - macOS: ~/Library/Application Support/memory-orbs/settings.json
/// - Windows: %APPDATA%\memory-orbs\settings.json
///
/// A missing file means defaults. The caption API key is never stored
/// here, only the name of the environment variable holding it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    // ========== Sphere ==========

    /// Sphere radius in logical pixels
    pub sphere_radius: f32,

    /// Perspective distance in logical pixels (like CSS `perspective`)
    pub perspective: f32,

    /// Degrees of rotation per pixel of pointer drag
    pub drag_sensitivity: f32,

    /// Pitch clamp in degrees, None for free tumbling
    pub pitch_limit_deg: Option<f32>,

    /// Angular frequency of every critically-damped spring (rad/s)
    pub spring_frequency: f32,

    // ========== Uploads ==========

    /// Random spread around the camera-facing direction (radians, per axis)
    pub placement_jitter: f32,

    /// Distance uploads keep from the poles (radians)
    pub pole_margin: f32,

    /// Folder of photos shown at startup
    pub seed_dir: Option<PathBuf>,

    // ========== World slideshow ==========

    /// Autoplay step interval in milliseconds
    pub autoplay_interval_ms: u64,

    // ========== Caption service ==========

    /// Base URL of a generateContent-style endpoint
    pub caption_endpoint: String,

    /// Model name appended to the endpoint
    pub caption_model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Upper bound on a single caption request
    pub caption_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sphere_radius: 320.0,
            perspective: 1000.0,
            drag_sensitivity: 0.3,
            pitch_limit_deg: Some(85.0),
            spring_frequency: 12.0,
            placement_jitter: 0.15,
            pole_margin: 0.1,
            seed_dir: None,
            autoplay_interval_ms: 5000,
            caption_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            caption_model: "gemini-2.5-flash".to_string(),
            api_key_env: "MEMORY_ORBS_API_KEY".to_string(),
            caption_timeout_secs: 20,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    info!("⚙️  Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Ignoring malformed settings at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Write a template so there is something to edit
                let settings = Self::default();
                if let Err(e) = settings.save_to(&path) {
                    warn!("Could not write default settings to {}: {}", path.display(), e);
                }
                settings
            }
            Err(e) => {
                warn!("Could not read settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating the directory if needed
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!("⚙️  Wrote settings to {}", path.display());
        Ok(())
    }

    /// Get the path where the settings file lives
    fn settings_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("memory-orbs");
        path.push("settings.json");
        Some(path)
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms.max(1))
    }

    pub fn caption_timeout(&self) -> Duration {
        Duration::from_secs(self.caption_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "sphere_radius": 200.0 }"#).unwrap();

        assert_eq!(settings.sphere_radius, 200.0);
        assert_eq!(settings.autoplay_interval(), Duration::from_secs(5));
        assert_eq!(settings.pitch_limit_deg, Some(85.0));
    }

    #[test]
    fn test_serialization() {
        let mut settings = Settings::default();
        settings.caption_timeout_secs = 30;
        settings.pitch_limit_deg = None;

        let json = settings.to_json().unwrap();
        let restored = Settings::from_json(&json).unwrap();

        assert_eq!(settings, restored);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("memory-orbs-settings-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("settings.json");
        let settings = Settings {
            sphere_radius: 180.0,
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        let restored = Settings::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(restored, settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_durations_are_bounded() {
        let settings = Settings {
            autoplay_interval_ms: 0,
            caption_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(settings.autoplay_interval() > Duration::ZERO);
        assert!(settings.caption_timeout() > Duration::ZERO);
    }
}
