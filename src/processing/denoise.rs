use crate::buffer::{CHANNELS, PixelBuffer, to_channel};
use crate::error::{Result, check_range};
use crate::state::EnhancementConfig;

pub const DEFAULT_THRESHOLD: f32 = 30.0;

/// Applies edge-preserving smoothing when `config.denoise` is non-zero.
pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    if skips(config, buf.width(), buf.height()) {
        return Ok(buf);
    }
    denoise(&buf, config.denoise, config.denoise_threshold)
}

pub fn skips(config: &EnhancementConfig, _width: u32, _height: u32) -> bool {
    config.denoise.abs() < 0.001
}

/// Bilateral-style smoothing over a `(2r+1)^2` window, `r = max(1, strength / 30)`.
///
/// Neighbours whose value differs from the centre by `threshold` or more get
/// zero weight, so strong edges survive. The result is blended with the
/// original by `min(1, strength / 100)`. Pixels closer than `r` to any edge
/// are copied through untouched, as is alpha.
pub fn denoise(buf: &PixelBuffer, strength: f32, threshold: f32) -> Result<PixelBuffer> {
    check_range("denoise", strength, f32::MIN_POSITIVE, 100.0)?;
    check_range("denoise_threshold", threshold, f32::MIN_POSITIVE, 255.0)?;

    let radius = ((strength / 30.0).floor() as usize).max(1);
    let blend = (strength / 100.0).min(1.0);
    let two_t2 = 2.0 * threshold * threshold;
    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let src = buf.as_raw();

    PixelBuffer::from_rows(buf.width(), buf.height(), |y, out| {
        out.copy_from_slice(buf.row(y));
        if y < radius || y + radius >= h {
            return;
        }
        for x in radius..w.saturating_sub(radius) {
            let i = buf.index(x, y);
            for c in 0..3 {
                let center = src[i + c] as f32;
                let mut sum = 0.0f32;
                let mut weight_sum = 0.0f32;
                for ny in y - radius..=y + radius {
                    for nx in x - radius..=x + radius {
                        let v = src[buf.index(nx, ny) + c] as f32;
                        let delta = v - center;
                        if delta.abs() < threshold {
                            let weight = (-(delta * delta) / two_t2).exp();
                            sum += v * weight;
                            weight_sum += weight;
                        }
                    }
                }
                // The centre always contributes weight 1.
                let avg = sum / weight_sum;
                out[x * CHANNELS + c] = to_channel(center * (1.0 - blend) + avg * blend);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    use super::*;

    fn noisy_flat(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            let n = if (x + y) % 2 == 0 { 100 } else { 110 };
            [n, n, n, 200]
        })
        .unwrap()
    }

    #[test]
    fn zero_strength_skips_stage() {
        let buf = noisy_flat(6, 6);
        let ptr = buf.as_raw().as_ptr();
        let out = apply(buf, &EnhancementConfig::default()).unwrap();
        assert_eq!(out.as_raw().as_ptr(), ptr);
    }

    #[test]
    fn zero_strength_is_not_a_filter() {
        let buf = noisy_flat(4, 4);
        assert!(matches!(
            denoise(&buf, 0.0, DEFAULT_THRESHOLD),
            Err(Error::InvalidParameter { name: "denoise", .. })
        ));
    }

    #[test]
    fn smooths_low_contrast_noise() {
        let buf = noisy_flat(5, 5);
        let out = denoise(&buf, 100.0, DEFAULT_THRESHOLD).unwrap();
        // strength 100 -> radius 3, larger than the interior of 5x5: all border.
        assert_eq!(out, buf);

        let buf = noisy_flat(9, 9);
        let out = denoise(&buf, 100.0, DEFAULT_THRESHOLD).unwrap();
        let before = buf.pixel(4, 4)[0] as i32;
        let after = out.pixel(4, 4)[0] as i32;
        assert!((after - 105).abs() < (before - 105).abs());
        assert_eq!(out.pixel(4, 4)[3], 200);
    }

    #[test]
    fn preserves_strong_edges() {
        // Left half 20, right half 220: every cross-edge delta exceeds the threshold.
        let buf = PixelBuffer::from_fn(8, 8, |x, _| {
            let v = if x < 4 { 20 } else { 220 };
            [v, v, v, 255]
        })
        .unwrap();
        let out = denoise(&buf, 60.0, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn border_within_radius_passes_through() {
        let buf = PixelBuffer::from_fn(7, 7, |x, y| {
            let v = ((x * 7 + y * 3) % 11) as u8 + 100;
            [v, v, v, 255]
        })
        .unwrap();
        let out = denoise(&buf, 30.0, DEFAULT_THRESHOLD).unwrap();
        for i in 0..7 {
            assert_eq!(out.pixel(i, 0), buf.pixel(i, 0));
            assert_eq!(out.pixel(i, 6), buf.pixel(i, 6));
            assert_eq!(out.pixel(0, i), buf.pixel(0, i));
            assert_eq!(out.pixel(6, i), buf.pixel(6, i));
        }
    }
}
