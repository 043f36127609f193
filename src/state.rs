use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, check_range};

/// Resampling kernel used when upscaling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Bicubic,
    Lanczos,
    Bilinear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Enhancement parameters for one pipeline run.
///
/// Every field defaults to the value that turns its stage into a no-op.
pub struct EnhancementConfig {
    pub scale: f32,
    pub method: Method,
    pub denoise: f32,
    pub denoise_threshold: f32,
    pub sharpen: f32,
    pub sharpen_radius: f32,
    pub sharpen_threshold: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub vibrance: f32,
    pub gamma: f32,
    pub edge_enhancement: f32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            method: Method::Bicubic,
            denoise: 0.0,
            denoise_threshold: 30.0,
            sharpen: 0.0,
            sharpen_radius: 1.0,
            sharpen_threshold: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            vibrance: 0.0,
            gamma: 1.0,
            edge_enhancement: 0.0,
        }
    }
}

impl EnhancementConfig {
    /// Rejects any field outside its documented domain.
    pub fn validate(&self) -> Result<()> {
        if !(1.0..=4.0).contains(&self.scale) {
            return Err(Error::InvalidDimensions(format!(
                "scale {} outside 1..=4",
                self.scale
            )));
        }
        check_range("denoise", self.denoise, 0.0, 100.0)?;
        check_range("denoise_threshold", self.denoise_threshold, 1.0, 255.0)?;
        check_range("sharpen", self.sharpen, 0.0, 100.0)?;
        check_range("sharpen_radius", self.sharpen_radius, 0.1, 10.0)?;
        check_range("sharpen_threshold", self.sharpen_threshold, 0.0, 255.0)?;
        check_range("brightness", self.brightness, -100.0, 100.0)?;
        check_range("contrast", self.contrast, -100.0, 100.0)?;
        check_range("saturation", self.saturation, -100.0, 100.0)?;
        check_range("highlights", self.highlights, -100.0, 100.0)?;
        check_range("shadows", self.shadows, -100.0, 100.0)?;
        check_range("vibrance", self.vibrance, -100.0, 100.0)?;
        check_range("gamma", self.gamma, 0.5, 2.5)?;
        check_range("edge_enhancement", self.edge_enhancement, 0.0, 100.0)?;
        Ok(())
    }

    /// Output size for a `width x height` source: `floor(side * scale)`.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = self.scale as f64;
        (
            (width as f64 * scale).floor() as u32,
            (height as f64 * scale).floor() as u32,
        )
    }

    pub fn color_is_neutral(&self) -> bool {
        self.gamma == 1.0
            && self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.highlights == 0.0
            && self.shadows == 0.0
            && self.vibrance == 0.0
    }

    /// True when every stage would be skipped.
    pub fn is_identity(&self) -> bool {
        self.scale <= 1.0
            && self.denoise == 0.0
            && self.sharpen == 0.0
            && self.edge_enhancement == 0.0
            && self.color_is_neutral()
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads a preset file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }
}
