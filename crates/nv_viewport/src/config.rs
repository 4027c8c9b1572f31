//! Viewer configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "camera": { "flip_y": false }, "scheduler": { "throttle_ms": 33 } }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use nv_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the scene manager, scheduler and ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub scheduler: SchedulerConfig,
    pub controls: ControlsConfig,
    pub ingest: IngestConfig,
}

/// Camera lens and placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Distance from the scene origin along +Z
    pub distance: f32,
    pub near: f32,
    pub far: f32,
    /// Use -Y as the camera up vector to match image-space tracings
    pub flip_y: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            distance: 15000.0,
            near: 1.0,
            far: 100000.0,
            flip_y: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Scene-center point; entities are offset by its negation at load
    pub center: Vec3,
    pub light_distance: f32,
    pub light_intensity: f32,
    pub background: Color,
    pub compartment_color: Color,
    /// Point sprite size in pixels
    pub point_size: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            light_distance: 10000.0,
            light_intensity: 1.0,
            background: Color::new(0.02, 0.02, 0.05),
            compartment_color: Color::new(0.6, 0.6, 0.6),
            point_size: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum time between scheduled renders, in milliseconds
    pub throttle_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { throttle_ms: 50.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Fraction of the pending motion applied per update (0..1]
    pub damping: f32,
    /// Radians per pixel of drag
    pub rotate_speed: f32,
    /// Fraction of the camera distance per pixel of drag
    pub pan_speed: f32,
    /// Zoom factor per wheel line
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping: 0.25,
            rotate_speed: 0.005,
            pan_speed: 0.001,
            zoom_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Upper bound on reading one file
    pub read_timeout_secs: u64,
    /// Color of the first collection (whole neuron or axon)
    pub primary_color: Color,
    /// Color of the second collection (dendrite)
    pub secondary_color: Color,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: 30,
            primary_color: Color::BLUE,
            secondary_color: Color::GREEN,
        }
    }
}

impl IngestConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl ViewerConfig {
    /// Load a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert!(config.camera.flip_y);
        assert_eq!(config.scheduler.throttle_ms, 50.0);
        assert_eq!(config.ingest.primary_color, Color::BLUE);
        assert_eq!(config.ingest.secondary_color, Color::GREEN);
        assert_eq!(config.ingest.read_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json() {
        let config = ViewerConfig::from_json(
            r#"{"camera": {"flip_y": false}, "scene": {"center": [1.0, 2.0, 3.0]}}"#,
        )
        .unwrap();

        assert!(!config.camera.flip_y);
        assert_eq!(config.camera.distance, 15000.0);
        assert_eq!(config.scene.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ViewerConfig::from_json("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(ViewerConfig::from_json("{\"camera\": 5}").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(ViewerConfig::load("/no/such/config.json").is_err());
        assert!(ViewerConfig::load_or_default(None).is_ok());
    }
}
