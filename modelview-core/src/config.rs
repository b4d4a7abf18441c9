//! Viewer constants.
//!
//! The element exposes no attributes, so [`ViewerConfig::default`] is what a
//! page always gets. Native hosts may override fields from JSON.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::scene::Color;

/// Asset requested on mount when nothing else is configured.
pub const DEFAULT_MODEL_URL: &str = "WWS_000.glb";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance along +Z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 0.5,
            near: 0.1,
            far: 2000.0,
            distance: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: Color,
    pub ambient_intensity: f32,
    pub directional_color: Color,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: Color::from_hex(0x404040),
            ambient_intensity: 1.0,
            directional_color: Color::from_hex(0xffffff),
            directional_intensity: 1.0,
            directional_position: [5.0, 10.0, 7.5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub antialias: bool,
    /// RGB clear color
    pub background: Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            antialias: true,
            background: Color::from_hex(0x000000),
        }
    }
}

/// Everything the scene initializer needs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    pub renderer: RendererConfig,
    pub model_url: String,
    /// Euler XYZ rotation (radians) applied to the loaded model root
    pub model_rotation: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lighting: LightingConfig::default(),
            renderer: RendererConfig::default(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_rotation: [std::f32::consts::FRAC_PI_2, 0.0, 0.0],
        }
    }
}

impl ViewerConfig {
    /// Parse a (possibly partial) JSON override and validate it
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        check("camera.fov", "in (0, 180)", camera.fov, camera.fov > 0.0 && camera.fov < 180.0)?;
        check("camera.near", "positive", camera.near, camera.near > 0.0)?;
        check("camera.far", "greater than camera.near", camera.far, camera.far > camera.near)?;
        check("camera.distance", "positive", camera.distance, camera.distance > 0.0)?;

        let controls = &self.controls;
        check(
            "controls.damping_factor",
            "in (0, 1]",
            controls.damping_factor,
            controls.damping_factor > 0.0 && controls.damping_factor <= 1.0,
        )?;
        check(
            "controls.max_distance",
            "at least controls.min_distance",
            controls.max_distance,
            controls.max_distance >= controls.min_distance,
        )?;
        Ok(())
    }
}

fn check(
    field: &'static str,
    expected: &'static str,
    value: f32,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_viewer_constants() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.fov, 0.5);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 2000.0);
        assert_eq!(config.camera.distance, 10.0);
        assert!(config.controls.enable_damping);
        assert!((config.controls.damping_factor - 0.05).abs() < 1e-6);
        assert_eq!(config.model_url, "WWS_000.glb");
        assert!((config.model_rotation[0] - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config = ViewerConfig::from_json_str(
            r#"{ "camera": { "fov": 45.0 }, "model_url": "part.stl" }"#,
        )
        .unwrap();
        assert_eq!(config.camera.fov, 45.0);
        assert_eq!(config.camera.far, 2000.0);
        assert_eq!(config.model_url, "part.stl");
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = ViewerConfig::from_json_str(r#"{ "controls": { "damping_factor": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "controls.damping_factor",
                ..
            }
        ));
    }
}
