use crate::buffer::{CHANNELS, PixelBuffer, to_channel};
use crate::error::{Result, check_range};
use crate::state::EnhancementConfig;

/// Color subset of [`EnhancementConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjustments {
    pub gamma: f32,
    pub shadows: f32,
    pub highlights: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub vibrance: f32,
}

impl Default for ColorAdjustments {
    fn default() -> Self {
        Self::from(&EnhancementConfig::default())
    }
}

impl From<&EnhancementConfig> for ColorAdjustments {
    fn from(config: &EnhancementConfig) -> Self {
        Self {
            gamma: config.gamma,
            shadows: config.shadows,
            highlights: config.highlights,
            brightness: config.brightness,
            contrast: config.contrast,
            saturation: config.saturation,
            vibrance: config.vibrance,
        }
    }
}

/// Applies gamma, tone split, brightness, contrast, saturation and vibrance.
pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    if skips(config, buf.width(), buf.height()) {
        return Ok(buf);
    }
    grade(&buf, &ColorAdjustments::from(config))
}

pub fn skips(config: &EnhancementConfig, _width: u32, _height: u32) -> bool {
    config.color_is_neutral()
}

/// Per-pixel color grade; alpha is copied.
///
/// Working values are not clamped between steps, only when written back.
pub fn grade(buf: &PixelBuffer, adj: &ColorAdjustments) -> Result<PixelBuffer> {
    check_range("gamma", adj.gamma, 0.5, 2.5)?;
    check_range("shadows", adj.shadows, -100.0, 100.0)?;
    check_range("highlights", adj.highlights, -100.0, 100.0)?;
    check_range("brightness", adj.brightness, -100.0, 100.0)?;
    check_range("contrast", adj.contrast, -100.0, 100.0)?;
    check_range("saturation", adj.saturation, -100.0, 100.0)?;
    check_range("vibrance", adj.vibrance, -100.0, 100.0)?;

    let inv_gamma = 1.0 / adj.gamma;
    let contrast_factor =
        259.0 * (adj.contrast + 255.0) / (255.0 * (259.0 - adj.contrast));
    let saturation_gain = adj.saturation / 100.0 + 1.0;
    let vibrance = adj.vibrance / 100.0;

    PixelBuffer::from_rows(buf.width(), buf.height(), |y, out| {
        let row = buf.row(y);
        for (src, dst) in row
            .chunks_exact(CHANNELS)
            .zip(out.chunks_exact_mut(CHANNELS))
        {
            let mut rgb = [src[0] as f32, src[1] as f32, src[2] as f32];

            if adj.gamma != 1.0 {
                for v in &mut rgb {
                    *v = 255.0 * (*v / 255.0).powf(inv_gamma);
                }
            }

            let l = luma(rgb);
            let shadow_factor = ((128.0 - l) / 128.0).clamp(0.0, 1.0);
            let highlight_factor = ((l - 128.0) / 128.0).clamp(0.0, 1.0);
            let tone = adj.shadows * shadow_factor + adj.highlights * highlight_factor;

            for v in &mut rgb {
                *v += tone + adj.brightness;
                *v = contrast_factor * (*v - 128.0) + 128.0;
            }

            let gray = luma(rgb);
            if adj.saturation != 0.0 {
                for v in &mut rgb {
                    *v = gray + saturation_gain * (*v - gray);
                }
            }
            if adj.vibrance != 0.0 {
                let max = rgb[0].max(rgb[1]).max(rgb[2]);
                let avg = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
                let amt = (max - avg).abs() / 255.0;
                let gain = vibrance * (1.0 - amt) + 1.0;
                for v in &mut rgb {
                    *v = gray + gain * (*v - gray);
                }
            }

            dst[0] = to_channel(rgb[0]);
            dst[1] = to_channel(rgb[1]);
            dst[2] = to_channel(rgb[2]);
            dst[3] = src[3];
        }
    })
}

fn luma(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}
