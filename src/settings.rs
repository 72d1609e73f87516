// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            title: String::from("Hello World!"),
            resizable: true,
            vsync: true,
        }
    }
}

impl WindowSettings {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    /// Position change per frame while a movement key is held.
    pub move_step: f32,
    /// Rotation change per frame, in degrees, while an arrow key is held.
    pub turn_step_degrees: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            move_step: 0.1,
            turn_step_degrees: 10.0,
            fov_y_degrees: 30.0,
            near: 0.001,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    pub clear_color: [f32; 4],
    pub quad_color: [f32; 3],
    /// Optional PNG sampled across the quad.
    pub texture: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [1.0, 0.0, 0.0, 0.0],
            quad_color: [0.4, 0.1, 0.0],
            texture: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub camera: CameraSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization Error: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration Directory Not Found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Retrieves the path to the user settings file.
    pub fn user_settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir.join("hello_gl").join("settings.toml"))
    }

    /// Loads settings from a specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to a specified file path, ensuring the directory exists.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Loads the user settings file if there is one, otherwise the hardcoded defaults.
    pub fn load_user_settings() -> Self {
        match Settings::user_settings_path() {
            Ok(path) => Settings::load_or_default(&path),
            Err(e) => {
                log::warn!("{}. Using hardcoded defaults.", e);
                Settings::default()
            }
        }
    }

    /// Reads `path`, falling back to defaults when it is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!(
                "No settings at {}. Using hardcoded defaults.",
                path.display()
            );
            return Settings::default();
        }

        match Settings::load_from_file(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!(
                    "Failed to load settings from {}: {}. Using hardcoded defaults.",
                    path.display(),
                    e
                );
                Settings::default()
            }
        }
    }
}
