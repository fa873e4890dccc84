// Settings store - RON file in the platform config directory

use crate::settings::{Settings, SettingsError};
use ron::ser::PrettyConfig;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "rhythm_trainer";
const SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/rhythm_trainer/settings.ron`
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR).join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate; a missing file yields the defaults
    pub fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            log::info!(
                "No settings at {}, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let settings: Settings = ron::from_str(&contents)?;
        settings.validate()?;
        log::debug!("Settings loaded from {}", self.path.display());
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = ron::ser::to_string_pretty(settings, PrettyConfig::default())?;
        std::fs::write(&self.path, contents)?;
        log::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
