//! Tunable rendering parameters and application settings
//!
//! [`RenderConfig`] is the bag of values the settings panel edits while the
//! application is paused and the scene composer reads every frame.
//! [`AppSettings`] holds startup-only values (window, asset root) that can be
//! overridden through environment variables. Nothing here is persisted.

use std::path::PathBuf;

/// Rendering parameters grouped by concern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    // ambient light
    pub ambient_light_color: [f32; 3],
    pub ambient_light_intensity: f32,

    // directional light
    pub light_direction: [f32; 3],
    pub light_color: [f32; 3],
    pub light_intensity: f32,

    // material
    pub specular_exponent: f32,
    pub ambient_occlusion_mix: f32,
    pub normal_mapping_mix: f32,
    pub reflection_mix: f32,

    // tessellation
    pub tessellation_level: f32,
    pub displacement_factor: f32,
    pub wireframe: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ambient_light_color: [1.0, 1.0, 1.0],
            ambient_light_intensity: 0.25,

            light_direction: [2.7, -0.8, 0.7],
            light_color: [0.85, 0.8, 0.6],
            light_intensity: 0.75,

            specular_exponent: 27.0,
            ambient_occlusion_mix: 1.0,
            normal_mapping_mix: 1.0,
            reflection_mix: 0.15,

            tessellation_level: 10.0,
            displacement_factor: 0.05,
            wireframe: false,
        }
    }
}

impl RenderConfig {
    /// Ambient color pre-multiplied by its intensity.
    pub fn ambient_radiance(&self) -> [f32; 3] {
        scale(self.ambient_light_color, self.ambient_light_intensity)
    }

    /// Directional light color pre-multiplied by its intensity.
    pub fn light_radiance(&self) -> [f32; 3] {
        scale(self.light_color, self.light_intensity)
    }
}

fn scale(color: [f32; 3], intensity: f32) -> [f32; 3] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity]
}

/// Slider ranges used by the settings panel.
pub mod ranges {
    pub const TESSELLATION_LEVEL: (f32, f32) = (2.0, 20.0);
    pub const DISPLACEMENT_FACTOR: (f32, f32) = (0.0, 1.0);
    pub const UNIT: (f32, f32) = (0.0, 1.0);
    pub const LIGHT_DIRECTION: (f32, f32) = (-20.0, 20.0);
    pub const LIGHT_DIRECTION_SPEED: f32 = 0.1;
    pub const SPECULAR_EXPONENT: (f32, f32) = (0.0, 150.0);
}

pub const ASSET_DIR_VAR: &str = "TESSERA_ASSET_DIR";
pub const WIDTH_VAR: &str = "TESSERA_WIDTH";
pub const HEIGHT_VAR: &str = "TESSERA_HEIGHT";

/// Startup settings for the window and asset lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub asset_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            title: "Tessera - Tessellation".to_string(),
            width: 1280,
            height: 720,
            asset_dir: PathBuf::from("assets"),
        }
    }
}

impl AppSettings {
    /// Builds settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to the
    /// defaults for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(dir) = lookup(ASSET_DIR_VAR) {
            settings.asset_dir = PathBuf::from(dir);
        }
        if let Some(width) = parse_dimension(&lookup, WIDTH_VAR) {
            settings.width = width;
        }
        if let Some(height) = parse_dimension(&lookup, HEIGHT_VAR) {
            settings.height = height;
        }

        settings
    }

    /// Resolves a path relative to the asset root.
    pub fn asset(&self, relative: &str) -> PathBuf {
        self.asset_dir.join(relative)
    }
}

fn parse_dimension<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            log::warn!("ignoring {key}={raw:?}: expected a positive integer");
            None
        }
    }
}
