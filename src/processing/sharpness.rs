use rayon::prelude::*;

use crate::buffer::{CHANNELS, PixelBuffer, to_channel};
use crate::error::{Error, Result, check_range};
use crate::state::EnhancementConfig;

/// Applies an unsharp-mask style sharpening pass.
pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    if skips(config, buf.width(), buf.height()) {
        return Ok(buf);
    }
    sharpen(
        &buf,
        config.sharpen,
        config.sharpen_radius,
        config.sharpen_threshold,
    )
}

pub fn skips(config: &EnhancementConfig, _width: u32, _height: u32) -> bool {
    config.sharpen.abs() < 0.001
}

/// Unsharp mask: `orig + (orig - blurred) * amount / 100` wherever
/// `|orig - blurred| > threshold`. Alpha is copied.
pub fn sharpen(buf: &PixelBuffer, amount: f32, radius: f32, threshold: f32) -> Result<PixelBuffer> {
    check_range("sharpen", amount, 0.0, 100.0)?;
    check_range("sharpen_threshold", threshold, 0.0, 255.0)?;

    let blurred = gaussian_blur(buf, radius)?;
    let gain = amount / 100.0;

    PixelBuffer::from_rows(buf.width(), buf.height(), |y, out| {
        let orig = buf.row(y);
        let blur = blurred.row(y);
        out.copy_from_slice(orig);
        for ((o, s), b) in out
            .chunks_exact_mut(CHANNELS)
            .zip(orig.chunks_exact(CHANNELS))
            .zip(blur.chunks_exact(CHANNELS))
        {
            for c in 0..3 {
                let diff = s[c] as f32 - b[c] as f32;
                if diff.abs() > threshold {
                    o[c] = to_channel(s[c] as f32 + diff * gain);
                }
            }
        }
    })
}

/// Normalised 1-D Gaussian of `2 * ceil(3 * radius) + 1` taps.
pub fn gaussian_kernel(radius: f32) -> Vec<f32> {
    let half = (radius * 3.0).ceil() as i64;
    let two_r2 = 2.0 * radius * radius;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|x| (-((x * x) as f32) / two_r2).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur of the RGB channels with edge-clamped sampling.
///
/// The horizontal pass is kept in `f32`; only the vertical pass rounds.
pub fn gaussian_blur(buf: &PixelBuffer, radius: f32) -> Result<PixelBuffer> {
    check_range("sharpen_radius", radius, 0.1, 10.0)?;

    let kernel = gaussian_kernel(radius);
    let half = (kernel.len() / 2) as i64;
    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let plane_stride = w * 3;

    let len = plane_stride * h;
    let mut horizontal: Vec<f32> = Vec::new();
    horizontal
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailure {
            bytes: len * std::mem::size_of::<f32>(),
        })?;
    horizontal.resize(len, 0.0);

    horizontal
        .par_chunks_mut(plane_stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                for c in 0..3 {
                    row[x * 3 + c] = kernel
                        .iter()
                        .enumerate()
                        .map(|(k, weight)| {
                            let sx = x as i64 + k as i64 - half;
                            weight * buf.clamped(sx, y as i64, c) as f32
                        })
                        .sum();
                }
            }
        });

    let max_y = h as i64 - 1;
    PixelBuffer::from_rows(buf.width(), buf.height(), |y, out| {
        let alpha = buf.row(y);
        for x in 0..w {
            for c in 0..3 {
                let v: f32 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        let sy = (y as i64 + k as i64 - half).clamp(0, max_y) as usize;
                        weight * horizontal[sy * plane_stride + x * 3 + c]
                    })
                    .sum();
                out[x * CHANNELS + c] = to_channel(v);
            }
            out[x * CHANNELS + 3] = alpha[x * CHANNELS + 3];
        }
    })
}
