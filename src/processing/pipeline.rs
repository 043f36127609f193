use std::time::Instant;

use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::state::EnhancementConfig;

use super::{color, denoise, edges, resample, sharpness};

struct Stage {
    name: &'static str,
    skips: fn(&EnhancementConfig, u32, u32) -> bool,
    run: fn(PixelBuffer, &EnhancementConfig) -> Result<PixelBuffer>,
}

/// Stage order is fixed. A stage whose parameter is neutral is not run.
const STAGES: [Stage; 5] = [
    Stage {
        name: "resample",
        skips: resample::skips,
        run: resample::apply,
    },
    Stage {
        name: "denoise",
        skips: denoise::skips,
        run: denoise::apply,
    },
    Stage {
        name: "color",
        skips: color::skips,
        run: color::apply,
    },
    Stage {
        name: "edges",
        skips: edges::skips,
        run: edges::apply,
    },
    Stage {
        name: "sharpen",
        skips: sharpness::skips,
        run: sharpness::apply,
    },
];

/// Run every enabled stage of `config` over `buf`.
/// Order: resample → denoise → color → edges → sharpen.
///
/// The first failing stage aborts the run; intermediates are dropped.
pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    config.validate()?;

    let mut out = buf;
    for stage in &STAGES {
        let before = out.dimensions();
        let t0 = Instant::now();
        let skipped = (stage.skips)(config, out.width(), out.height());
        if !skipped {
            out = (stage.run)(out, config)?;
        }
        tracing::debug!(
            stage = stage.name,
            skipped,
            from = ?before,
            to = ?out.dimensions(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "stage finished"
        );
    }

    Ok(out)
}

/// Names of the stages `config` would run on a `width x height` image.
///
/// Only the resampler changes dimensions and it runs first, so later stages
/// are checked against the scaled size.
pub fn planned_stages(config: &EnhancementConfig, width: u32, height: u32) -> Vec<&'static str> {
    let mut dims = (width, height);
    let mut names = Vec::new();
    for stage in &STAGES {
        if (stage.skips)(config, dims.0, dims.1) {
            continue;
        }
        if stage.name == "resample" {
            dims = config.target_dimensions(dims.0, dims.1);
        }
        names.push(stage.name);
    }
    names
}

/// Enhances independent images in parallel; results keep the input order.
///
/// A failing image does not affect the others.
pub fn apply_batch(
    bufs: Vec<PixelBuffer>,
    config: &EnhancementConfig,
) -> Vec<Result<PixelBuffer>> {
    bufs.into_par_iter()
        .map(|buf| apply(buf, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::state::Method;

    use super::*;

    fn textured(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [
                ((x * 37 + y * 11) % 256) as u8,
                ((x * 5 + y * 71) % 256) as u8,
                ((x * y * 13) % 256) as u8,
                ((x + y) * 9 % 256) as u8,
            ]
        })
        .unwrap()
    }

    fn busy_config() -> EnhancementConfig {
        EnhancementConfig {
            scale: 1.5,
            method: Method::Lanczos,
            denoise: 45.0,
            sharpen: 60.0,
            brightness: 10.0,
            contrast: 25.0,
            saturation: 100.0,
            highlights: -30.0,
            shadows: 20.0,
            vibrance: 40.0,
            gamma: 1.4,
            edge_enhancement: 80.0,
            ..Default::default()
        }
    }

    #[test]
    fn neutral_config_is_byte_identity() {
        let buf = textured(13, 7);
        let out = apply(buf.clone(), &EnhancementConfig::default()).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn planned_stages_report_what_runs() {
        assert!(planned_stages(&EnhancementConfig::default(), 8, 8).is_empty());
        assert_eq!(
            planned_stages(&busy_config(), 8, 8),
            vec!["resample", "denoise", "color", "edges", "sharpen"]
        );

        // floor(2 * 1.2) = 2: the resampler has nothing to do.
        let config = EnhancementConfig {
            scale: 1.2,
            sharpen: 10.0,
            ..Default::default()
        };
        assert_eq!(planned_stages(&config, 2, 2), vec!["sharpen"]);
        assert_eq!(planned_stages(&config, 5, 5), vec!["resample", "sharpen"]);
        let out = apply(textured(2, 2), &config).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
    }

    #[test]
    fn output_dimensions_follow_scale() {
        let buf = textured(7, 5);
        for scale in [1.0, 1.3, 2.0, 2.75, 3.9, 4.0] {
            let config = EnhancementConfig {
                scale,
                ..Default::default()
            };
            let out = apply(buf.clone(), &config).unwrap();
            let expected = (
                (7.0 * scale as f64).floor() as u32,
                (5.0 * scale as f64).floor() as u32,
            );
            assert_eq!(out.dimensions(), expected, "scale {scale}");
        }
    }

    #[test]
    fn gray_upscale_stays_gray() {
        let buf = PixelBuffer::from_pixel(4, 4, [128, 128, 128, 255]).unwrap();
        let config = EnhancementConfig {
            scale: 2.0,
            ..Default::default()
        };
        let out = apply(buf, &config).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(
            out.as_raw()
                .chunks_exact(4)
                .all(|px| px == [128, 128, 128, 255])
        );
    }

    #[test]
    fn white_pixel_upscale_stays_white() {
        let buf = PixelBuffer::from_pixel(1, 1, [255, 255, 255, 255]).unwrap();
        let config = EnhancementConfig {
            scale: 3.0,
            method: Method::Lanczos,
            ..Default::default()
        };
        let out = apply(buf, &config).unwrap();
        assert_eq!(out.dimensions(), (3, 3));
        assert!(out.as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn non_resampling_stages_keep_alpha() {
        let buf = textured(9, 9);
        let config = EnhancementConfig {
            scale: 1.0,
            ..busy_config()
        };
        let out = apply(buf.clone(), &config).unwrap();
        let alpha = |b: &PixelBuffer| b.as_raw().chunks_exact(4).map(|p| p[3]).collect::<Vec<_>>();
        assert_eq!(alpha(&out), alpha(&buf));
    }

    #[test]
    fn resampled_alpha_matches_resampler() {
        let buf = textured(6, 4);
        let config = EnhancementConfig {
            scale: 2.0,
            method: Method::Bicubic,
            brightness: 30.0,
            edge_enhancement: 50.0,
            ..Default::default()
        };
        let out = apply(buf.clone(), &config).unwrap();
        let resampled = resample::resample(&buf, 12, 8, Method::Bicubic).unwrap();
        let alpha = |b: &PixelBuffer| b.as_raw().chunks_exact(4).map(|p| p[3]).collect::<Vec<_>>();
        assert_eq!(alpha(&out), alpha(&resampled));
    }

    #[test]
    fn extreme_settings_stay_in_range_and_saturate() {
        let buf = textured(10, 10);
        let config = EnhancementConfig {
            brightness: 100.0,
            contrast: 100.0,
            ..busy_config()
        };
        let out = apply(buf, &config).unwrap();
        assert_eq!(out.dimensions(), (15, 15));
        let raw = out.as_raw();
        assert!(raw.chunks_exact(4).any(|px| px[..3].contains(&255)));
    }

    #[test]
    fn invalid_config_aborts_before_any_stage() {
        let buf = textured(4, 4);
        let config = EnhancementConfig {
            scale: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            apply(buf.clone(), &config),
            Err(Error::InvalidDimensions(_))
        ));

        let config = EnhancementConfig {
            vibrance: 150.0,
            ..Default::default()
        };
        assert!(matches!(
            apply(buf, &config),
            Err(Error::InvalidParameter { name: "vibrance", .. })
        ));
    }

    #[test]
    fn batch_matches_sequential_runs() {
        let config = busy_config();
        let inputs: Vec<PixelBuffer> = (1..=6).map(|n| textured(3 + n, 2 + n)).collect();
        let sequential: Vec<PixelBuffer> = inputs
            .iter()
            .map(|b| apply(b.clone(), &config).unwrap())
            .collect();
        let batched: Vec<PixelBuffer> = apply_batch(inputs, &config)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(batched, sequential);
    }

    #[test]
    fn concurrent_threads_do_not_interfere() {
        let config = busy_config();
        let expected = apply(textured(11, 8), &config).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| apply(textured(11, 8), &config).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
