//! Viewport configuration, read from JSON. Every field has a default so a
//! partial file (or none at all) gives the stock substation scene.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::CameraPose;
use crate::error::ConfigError;
use crate::interaction::HighlightSettings;
use crate::math::Color;

/// How a loaded model is used once attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelRole {
    Scenery,
    /// Children of the model root become pickable devices
    Devices,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub url: String,
    pub role: ModelRole,
    /// Meshes whose name contains this get a scrolling texture
    #[serde(default)]
    pub scroll_pattern: Option<String>,
}

impl ModelSpec {
    pub fn scenery(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            role: ModelRole::Scenery,
            scroll_pattern: None,
        }
    }

    pub fn devices(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            role: ModelRole::Devices,
            scroll_pattern: None,
        }
    }

    pub fn with_scroll(mut self, pattern: impl Into<String>) -> Self {
        self.scroll_pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundSettings {
    pub enabled: bool,
    pub size: f32,
    pub height: f32,
    pub color: Color,
    pub repeat: f32,
}

impl Default for GroundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 500.0,
            height: -5.0,
            color: Color::from_hex(0x49a1f0),
            repeat: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientSettings {
    pub color: Color,
    pub intensity: f32,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x999999),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub text: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineFlags {
    pub enable_composers: bool,
    pub enable_picking: bool,
    pub enable_warming_cycle: bool,
}

impl Default for EngineFlags {
    fn default() -> Self {
        Self {
            enable_composers: true,
            enable_picking: true,
            enable_warming_cycle: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub asset_root: PathBuf,
    pub models: Vec<ModelSpec>,
    pub ground: GroundSettings,
    pub ambient: AmbientSettings,
    pub clear_color: Color,
    pub clear_alpha: f32,
    /// Edge length in pixels of one preview ray block
    pub preview_scale: u32,
    pub labels: Vec<LabelSpec>,
    pub home: CameraPose,
    pub home_flight_ms: f64,
    pub highlight: HighlightSettings,
    pub flags: EngineFlags,
    /// Tour script file; the built-in patrol route when absent
    pub tour: Option<PathBuf>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            models: vec![
                ModelSpec::scenery("/models/base2.glb").with_scroll("道路箭头"),
                ModelSpec::devices("/models/devices.glb"),
                ModelSpec::scenery("/models/lines.gltf"),
            ],
            ground: GroundSettings::default(),
            ambient: AmbientSettings::default(),
            clear_color: Color::BLACK,
            clear_alpha: 0.5,
            preview_scale: 4,
            labels: vec![LabelSpec {
                text: "1号主变".to_string(),
                position: Vec3::new(-33.0, 10.0, 14.0),
            }],
            home: CameraPose::HOME,
            home_flight_ms: 2000.0,
            highlight: HighlightSettings::default(),
            flags: EngineFlags::default(),
            tour: None,
        }
    }
}

impl ViewportConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            what: "viewport config".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.clear_alpha) {
            return Err(ConfigError::Invalid(format!(
                "clear_alpha must be within [0, 1], got {}",
                self.clear_alpha
            )));
        }
        if self.preview_scale == 0 {
            return Err(ConfigError::Invalid("preview_scale must be at least 1".to_string()));
        }
        if self.highlight.interval_ms.is_nan() || self.highlight.interval_ms <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "highlight interval must be positive, got {}",
                self.highlight.interval_ms
            )));
        }
        Ok(())
    }
}
