use std::time::Instant;

use anyhow::{Context, Result};

use enhancer::{EnhancementConfig, Method, PixelBuffer};

const DEFAULT_SIZE: u32 = 512;

fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

fn build_config() -> EnhancementConfig {
    EnhancementConfig {
        scale: 2.0,
        method: Method::Lanczos,
        denoise: 35.0,
        sharpen: 50.0,
        brightness: 5.0,
        contrast: 15.0,
        saturation: 10.0,
        highlights: -20.0,
        shadows: 20.0,
        vibrance: 25.0,
        gamma: 1.1,
        edge_enhancement: 20.0,
        ..Default::default()
    }
}

fn synthetic_image(size: u32) -> Result<PixelBuffer> {
    Ok(PixelBuffer::from_fn(size, size, |x, y| {
        let noise = ((x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % 17) as u8;
        [
            ((x * 255 / size) as u8).saturating_add(noise),
            ((y * 255 / size) as u8).saturating_add(noise),
            (((x + y) * 127 / size) as u8).saturating_add(noise),
            255,
        ]
    })?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args();
    let _bin = args.next();
    let size = match args.next() {
        Some(v) => v
            .parse::<u32>()
            .context("usage: perf_probe [size] [count]")?,
        None => DEFAULT_SIZE,
    };
    let count = args
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(10)
        .max(1);

    let config = build_config();
    let source = synthetic_image(size)?;
    eprintln!("Probing {}x{} source, {} runs", size, size, count);

    let mut single_samples = Vec::with_capacity(count);
    for _ in 0..count {
        let input = source.clone();
        let t0 = Instant::now();
        let out = enhancer::enhance(input, &config)?;
        single_samples.push(t0.elapsed().as_secs_f64() * 1000.0);
        std::hint::black_box(out);
    }

    let batch: Vec<PixelBuffer> = (0..count).map(|_| source.clone()).collect();
    let batch_start = Instant::now();
    let results = enhancer::enhance_batch(batch, &config);
    let batch_wall_s = batch_start.elapsed().as_secs_f64();
    for result in results {
        result?;
    }
    let images_per_sec = count as f64 / batch_wall_s.max(1e-9);

    println!("METRIC source_size={}", size);
    println!("METRIC run_count={}", count);
    println!("METRIC enhance_ms_median={:.2}", median_ms(&single_samples));
    println!("METRIC batch_wall_s={:.3}", batch_wall_s);
    println!("METRIC batch_images_per_sec={:.3}", images_per_sec);

    Ok(())
}
