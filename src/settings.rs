//! Race settings and preferences
//!
//! Runtime knobs only; physics tuning lives in `consts`. Persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::MIXER_DURATION_MS;
use crate::error::SettingsError;
use crate::sim::RaceMode;

/// How many spark particles the race keeps alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Spark cap
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Where bodies start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Spun in the mixer drum, then released
    #[default]
    Mixer,
    /// Shuffled grid across the top, released on the first tick
    Staggered,
}

/// Race settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Stop at the first finisher or rank everyone
    pub mode: RaceMode,
    pub placement: Placement,
    /// Particle quality preset
    pub quality: QualityPreset,
    /// Spark particles on collisions
    pub particles: bool,
    /// Time spent in the mixer before release (ms)
    pub mixer_duration_ms: f32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            mode: RaceMode::First,
            placement: Placement::Mixer,
            quality: QualityPreset::Medium,
            particles: true,
            mixer_duration_ms: MIXER_DURATION_MS,
        }
    }
}

impl RaceSettings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let settings = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_from_json() {
        let settings = RaceSettings::from_json(r#"{ "quality": "low" }"#).unwrap();
        assert_eq!(settings.quality, QualityPreset::Low);
        assert_eq!(settings.max_particles(), 100);
        assert!(RaceSettings::from_json(r#"{ "quality": "ultra" }"#).is_err());
    }

    #[test]
    fn test_particles_toggle_caps_to_zero() {
        let mut settings = RaceSettings::from_preset(QualityPreset::High);
        assert_eq!(settings.max_particles(), 2000);
        settings.particles = false;
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_json_round_trip_and_defaults() {
        let settings = RaceSettings {
            mode: RaceMode::Ranked,
            placement: Placement::Staggered,
            ..RaceSettings::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(RaceSettings::from_json(&json).unwrap(), settings);

        // Missing fields fall back to defaults
        let partial = RaceSettings::from_json(r#"{ "mode": "ranked" }"#).unwrap();
        assert_eq!(partial.mode, RaceMode::Ranked);
        assert_eq!(partial.mixer_duration_ms, MIXER_DURATION_MS);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = RaceSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = RaceSettings::load("/definitely/not/here/settings.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("marble-race-settings-{}.json", std::process::id()));
        let settings = RaceSettings::from_preset(QualityPreset::Low);
        settings.save(&path).unwrap();
        assert_eq!(RaceSettings::load(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);
    }
}
