use std::f64::consts::PI;

use crate::buffer::{CHANNELS, PixelBuffer, to_channel};
use crate::error::{Error, Result};
use crate::state::{EnhancementConfig, Method};

const CUBIC_A: f64 = -0.5;
const LANCZOS_LOBES: i64 = 3;

/// Upscales to `floor(size * scale)` with the configured kernel.
pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    if skips(config, buf.width(), buf.height()) {
        return Ok(buf);
    }
    let (new_w, new_h) = config.target_dimensions(buf.width(), buf.height());
    resample(&buf, new_w, new_h, config.method)
}

/// No-op when `scale <= 1` or flooring leaves the size unchanged.
pub fn skips(config: &EnhancementConfig, width: u32, height: u32) -> bool {
    config.scale <= 1.0 || config.target_dimensions(width, height) == (width, height)
}

/// Resamples all four channels to `new_width x new_height`.
///
/// Destination pixel `(dx, dy)` reads around source position
/// `(dx * width / new_width, dy * height / new_height)`; neighbour indices are
/// clamped to the source edges.
pub fn resample(
    buf: &PixelBuffer,
    new_width: u32,
    new_height: u32,
    method: Method,
) -> Result<PixelBuffer> {
    if new_width == 0 || new_height == 0 {
        return Err(Error::InvalidDimensions(format!(
            "cannot resample {}x{} to {}x{}",
            buf.width(),
            buf.height(),
            new_width,
            new_height
        )));
    }

    let mut out = PixelBuffer::new(new_width, new_height)?;

    let scale_x = buf.width() as f64 / new_width as f64;
    let scale_y = buf.height() as f64 / new_height as f64;

    // Weight tables depend only on the column (row), not on the pixel.
    let columns = tap_table(new_width, scale_x, buf.width(), method)?;
    let rows = tap_table(new_height, scale_y, buf.height(), method)?;

    let src = buf.as_raw();
    out.fill_rows(|dy, out_row| {
        let ty = &rows[dy];
        for (tx, px) in columns.iter().zip(out_row.chunks_exact_mut(CHANNELS)) {
            let mut acc = [0.0f64; CHANNELS];
            let mut weight_sum = 0.0f64;
            for &(sy, wy) in ty.as_slice() {
                for &(sx, wx) in tx.as_slice() {
                    let w = wx * wy;
                    let i = buf.index(sx, sy);
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += src[i + c] as f64 * w;
                    }
                    weight_sum += w;
                }
            }
            for (o, a) in px.iter_mut().zip(acc) {
                *o = if weight_sum == 0.0 {
                    0
                } else {
                    to_channel((a / weight_sum) as f32)
                };
            }
        }
    });
    Ok(out)
}

fn tap_table(count: u32, step: f64, len: u32, method: Method) -> Result<Vec<Taps>> {
    let count = count as usize;
    let mut table = Vec::new();
    table
        .try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailure {
            bytes: count.saturating_mul(std::mem::size_of::<Taps>()),
        })?;
    table.extend((0..count).map(|d| Taps::new(d as f64 * step, len, method)));
    Ok(table)
}

const MAX_TAPS: usize = 2 * LANCZOS_LOBES as usize;

/// Clamped source indices and kernel weights for one output coordinate.
struct Taps {
    taps: [(usize, f64); MAX_TAPS],
    len: usize,
}

impl Taps {
    fn new(pos: f64, len: u32, method: Method) -> Self {
        let base = pos.floor() as i64;
        let (first, last): (i64, i64) = match method {
            Method::Bicubic => (base - 1, base + 2),
            Method::Lanczos => (base - LANCZOS_LOBES + 1, base + LANCZOS_LOBES),
            Method::Bilinear => (base, base + 1),
        };
        let max = len as i64 - 1;
        let mut taps = [(0, 0.0); MAX_TAPS];
        let mut n = 0;
        for i in first..=last {
            let t = pos - i as f64;
            let w = match method {
                Method::Bicubic => cubic(t),
                Method::Lanczos => lanczos(t),
                Method::Bilinear => (1.0 - t.abs()).max(0.0),
            };
            taps[n] = (i.clamp(0, max) as usize, w);
            n += 1;
        }
        Self { taps, len: n }
    }

    fn as_slice(&self) -> &[(usize, f64)] {
        &self.taps[..self.len]
    }
}

/// Keys cubic convolution kernel with `a = -0.5`.
pub fn cubic(t: f64) -> f64 {
    let a = CUBIC_A;
    let t = t.abs();
    if t <= 1.0 {
        (a + 2.0) * t * t * t - (a + 3.0) * t * t + 1.0
    } else if t <= 2.0 {
        a * t * t * t - 5.0 * a * t * t + 8.0 * a * t - 4.0 * a
    } else {
        0.0
    }
}

/// Three-lobe Lanczos windowed sinc.
pub fn lanczos(x: f64) -> f64 {
    let a = LANCZOS_LOBES as f64;
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let px = PI * x;
    a * px.sin() * (px / a).sin() / (px * px)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_2x2() -> PixelBuffer {
        // Red channel 40, 80 / 120, 160; alpha mirrors red.
        PixelBuffer::from_fn(2, 2, |x, y| {
            let v = (40 + 40 * x + 80 * y) as u8;
            [v, 0, 255, v]
        })
        .unwrap()
    }

    #[test]
    fn cubic_kernel_shape() {
        assert_eq!(cubic(0.0), 1.0);
        assert_eq!(cubic(1.0), 0.0);
        assert_eq!(cubic(2.0), 0.0);
        assert_eq!(cubic(2.5), 0.0);
        assert!((cubic(0.5) - 0.5625).abs() < 1e-12);
        assert!((cubic(1.5) + 0.0625).abs() < 1e-12);
        assert_eq!(cubic(-0.75), cubic(0.75));
    }

    #[test]
    fn lanczos_kernel_shape() {
        assert_eq!(lanczos(0.0), 1.0);
        assert_eq!(lanczos(3.0), 0.0);
        assert_eq!(lanczos(-4.0), 0.0);
        assert!(lanczos(1.0).abs() < 1e-12);
        assert!(lanczos(0.5) > 0.0);
        assert!(lanczos(1.5) < 0.0);
    }

    #[test]
    fn uniform_gray_stays_uniform_bicubic() {
        let buf = PixelBuffer::from_pixel(4, 4, [128, 128, 128, 255]).unwrap();
        let out = resample(&buf, 8, 8, Method::Bicubic).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(
            out.as_raw()
                .chunks_exact(4)
                .all(|px| px == [128, 128, 128, 255])
        );
    }

    #[test]
    fn single_white_pixel_lanczos() {
        let buf = PixelBuffer::from_pixel(1, 1, [255, 255, 255, 255]).unwrap();
        let out = resample(&buf, 3, 3, Method::Lanczos).unwrap();
        assert_eq!(out.dimensions(), (3, 3));
        assert!(out.as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn bicubic_corners_of_2x2_at_4x() {
        let out = resample(&ramp_2x2(), 8, 8, Method::Bicubic).unwrap();
        // Top-left samples the source exactly.
        assert_eq!(out.pixel(0, 0), [40, 0, 255, 40]);
        // x = 1.75: weights -0.0234375 on column 0, 1.0234375 on column 1.
        assert_eq!(out.pixel(7, 0)[0], 81);
        assert_eq!(out.pixel(0, 7)[0], 122);
        assert_eq!(out.pixel(7, 7)[0], 163);
        // Alpha follows the same kernel as color.
        assert_eq!(out.pixel(7, 7)[3], 163);
        assert_eq!(out.pixel(7, 7)[2], 255);
    }

    #[test]
    fn lanczos_corners_of_2x2_at_4x() {
        let out = resample(&ramp_2x2(), 8, 8, Method::Lanczos).unwrap();
        assert_eq!(out.pixel(0, 0)[0], 40);
        assert_eq!(out.pixel(7, 0)[0], 82);
        assert_eq!(out.pixel(7, 7)[0], 167);
        assert_eq!(out.pixel(7, 7)[3], 167);
    }

    #[test]
    fn bilinear_interpolates_between_neighbours() {
        let out = resample(&ramp_2x2(), 4, 1, Method::Bilinear).unwrap();
        // Source x positions 0, 0.5, 1, 1.5 on row 0.
        let reds: Vec<u8> = (0..4).map(|x| out.pixel(x, 0)[0]).collect();
        assert_eq!(reds, vec![40, 60, 80, 80]);
    }

    #[test]
    fn non_uniform_resize_uses_per_axis_ratio() {
        let buf = PixelBuffer::from_pixel(3, 2, [9, 8, 7, 6]).unwrap();
        let out = resample(&buf, 7, 3, Method::Bicubic).unwrap();
        assert_eq!(out.dimensions(), (7, 3));
        assert!(out.as_raw().chunks_exact(4).all(|px| px == [9, 8, 7, 6]));
    }

    #[test]
    fn zero_target_is_rejected() {
        let buf = PixelBuffer::from_pixel(2, 2, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            resample(&buf, 0, 4, Method::Bicubic),
            Err(Error::InvalidDimensions(_))
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_target_is_an_allocation_failure() {
        let buf = PixelBuffer::from_pixel(1, 1, [1, 2, 3, 4]).unwrap();
        assert!(matches!(
            resample(&buf, u32::MAX, 1 << 30, Method::Bicubic),
            Err(Error::AllocationFailure { .. })
        ));
    }

    #[test]
    fn lanczos_uses_six_taps() {
        let taps = Taps::new(2.25, 10, Method::Lanczos);
        let indices: Vec<usize> = taps.as_slice().iter().map(|&(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        let taps = Taps::new(0.5, 10, Method::Bilinear);
        assert_eq!(taps.as_slice().len(), 2);
    }

    #[test]
    fn apply_uses_floor_of_scaled_size() {
        let mut config = EnhancementConfig::default();
        config.scale = 1.5;
        let buf = PixelBuffer::from_pixel(5, 3, [1, 2, 3, 4]).unwrap();
        let out = apply(buf, &config).unwrap();
        assert_eq!(out.dimensions(), (7, 4));
    }

    #[test]
    fn apply_skips_unit_scale() {
        let buf = ramp_2x2();
        let ptr = buf.as_raw().as_ptr();
        let out = apply(buf, &EnhancementConfig::default()).unwrap();
        assert_eq!(out.as_raw().as_ptr(), ptr);
    }
}
