//! Game configuration.
//!
//! Loaded once at startup from JSON and shared read-only through the services
//! context for the whole session. Every field has a default, so a partial
//! file (or none at all) is valid.

use std::path::{Path, PathBuf};

use rail_math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default prototype spawned when the player fires.
pub const DEFAULT_PROJECTILE_PROTOTYPE: &str = "Projectile";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`GameConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for gameplay components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Launch speed of player projectiles, in units per second.
    pub projectile_speed: f32,
    /// Extra upward launch speed, in units per second.
    pub projectile_upkick: f32,
    /// Height above the player at which projectiles appear.
    pub projectile_height_offset: f32,
    /// Distance along the launch velocity at which projectiles appear.
    pub projectile_forward_offset: f32,
    /// Lower bound of a projectile's spin, per axis, in degrees per second.
    pub projectile_min_angular_velocity: Vec3,
    /// Upper bound of a projectile's spin, per axis, in degrees per second.
    pub projectile_max_angular_velocity: Vec3,
    /// Prototype spawned when the player fires.
    pub projectile_prototype: String,
    /// Seed for gameplay randomness; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            projectile_speed: 30.0,
            projectile_upkick: 4.0,
            projectile_height_offset: 1.0,
            projectile_forward_offset: 1.5,
            projectile_min_angular_velocity: Vec3::splat(90.0),
            projectile_max_angular_velocity: Vec3::splat(360.0),
            projectile_prototype: DEFAULT_PROJECTILE_PROTOTYPE.to_string(),
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`], [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        info!(path = %path.display(), "loaded game config");
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.projectile_speed.is_finite() && self.projectile_speed >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "projectile_speed must be a non-negative number, got {}",
                self.projectile_speed
            )));
        }
        let (min, max) = (
            self.projectile_min_angular_velocity,
            self.projectile_max_angular_velocity,
        );
        if min.cmplt(Vec3::ZERO).any() || min.cmpgt(max).any() {
            return Err(ConfigError::Invalid(format!(
                "angular velocity bounds must satisfy 0 <= min <= max, got {min} and {max}"
            )));
        }
        if self.projectile_prototype.is_empty() {
            return Err(ConfigError::Invalid(
                "projectile_prototype must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
