// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::watermark::text_renderer::Color;
use crate::watermark::WatermarkError;

/// Points per millimetre (72 / 25.4), the default raster unit scale.
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Resolution at which raster font sizes (points) are turned into pixels.
pub const DEFAULT_RASTER_DPI: f32 = 96.0;

fn default_font_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("fonts"),
        PathBuf::from("/usr/share/fonts/truetype/freefont"),
    ]
}

fn default_font_family() -> String {
    "FreeSerif".to_string()
}

/// Immutable engine configuration shared by every watermark call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatermarkConfig {
    /// Directories searched, in order, for raster fonts
    #[serde(default = "default_font_dirs")]
    pub font_dirs: Vec<PathBuf>,

    /// Font family used when a request names none (default: FreeSerif)
    #[serde(default = "default_font_family")]
    pub default_font_family: String,

    /// Label color used when a request names none (default: #C0C0C0)
    #[serde(default)]
    pub default_color: Color,

    /// Where output files are created (default: system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Factor applied to caller coordinates on the raster backend
    #[serde(default = "default_raster_unit_scale")]
    pub raster_unit_scale: f32,

    /// Resolution used to turn raster font sizes into pixels
    #[serde(default = "default_raster_dpi")]
    pub raster_dpi: f32,
}

fn default_raster_unit_scale() -> f32 {
    POINTS_PER_MM
}

fn default_raster_dpi() -> f32 {
    DEFAULT_RASTER_DPI
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_dirs: default_font_dirs(),
            default_font_family: default_font_family(),
            default_color: Color::default(),
            output_dir: None,
            raster_unit_scale: default_raster_unit_scale(),
            raster_dpi: default_raster_dpi(),
        }
    }
}

impl WatermarkConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, WatermarkError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| WatermarkError::Config(e.to_string()))?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            })
        });

        if let Some(var_name) = missing {
            return Err(WatermarkError::Config(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            )));
        }

        let config: WatermarkConfig = serde_yaml::from_str(&substituted)
            .map_err(|e| WatermarkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| WatermarkError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.font_dirs.is_empty() {
            return Err(WatermarkError::Config(
                "font_dirs must list at least one directory".to_string(),
            ));
        }

        if self.default_font_family.trim().is_empty() {
            return Err(WatermarkError::Config(
                "default_font_family cannot be empty".to_string(),
            ));
        }

        if !(self.raster_unit_scale.is_finite() && self.raster_unit_scale > 0.0) {
            return Err(WatermarkError::Config(format!(
                "raster_unit_scale must be positive, got {}",
                self.raster_unit_scale
            )));
        }

        if !(self.raster_dpi.is_finite() && self.raster_dpi > 0.0) {
            return Err(WatermarkError::Config(format!(
                "raster_dpi must be positive, got {}",
                self.raster_dpi
            )));
        }

        Ok(())
    }

    /// Directory output files are created in.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Pixel size for a raster font size given in points.
    pub fn raster_px_size(&self, font_size: i32) -> f32 {
        font_size as f32 * self.raster_dpi / 72.0
    }
}
