mod config;
mod export;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use rayon::prelude::*;

use config::AppConfig;
use enhancer::{EnhancementConfig, Method};
use export::{RenderFormat, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "enhancer")]
#[command(about = "Upscale, denoise, grade and sharpen images")]
struct Cli {
    /// Image files or directories of images
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (default: ./enhanced)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Preset file (.toml or .json) with enhancement settings
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<RenderFormat>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Process images one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Upscale factor (1.0-4.0)
    #[arg(long)]
    scale: Option<f32>,

    /// Resampling kernel
    #[arg(long, value_enum)]
    method: Option<CliMethod>,

    /// Edge-preserving denoise strength (0-100)
    #[arg(long)]
    denoise: Option<f32>,

    /// Largest neighbour difference that still gets averaged (1-255)
    #[arg(long)]
    denoise_threshold: Option<f32>,

    /// Unsharp mask amount (0-100)
    #[arg(long)]
    sharpen: Option<f32>,

    /// Gaussian sigma for the unsharp mask (0.1-10)
    #[arg(long)]
    sharpen_radius: Option<f32>,

    /// Minimum difference from the blur before sharpening applies (0-255)
    #[arg(long)]
    sharpen_threshold: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    brightness: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    highlights: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    shadows: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    vibrance: Option<f32>,

    /// Gamma (0.5-2.5)
    #[arg(long)]
    gamma: Option<f32>,

    /// Sobel edge boost (0-100)
    #[arg(long)]
    edge_enhancement: Option<f32>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliMethod {
    Bicubic,
    Lanczos,
    Bilinear,
}

impl From<CliMethod> for Method {
    fn from(m: CliMethod) -> Self {
        match m {
            CliMethod::Bicubic => Method::Bicubic,
            CliMethod::Lanczos => Method::Lanczos,
            CliMethod::Bilinear => Method::Bilinear,
        }
    }
}

/// Preset file first, then explicit flags on top.
fn resolve_enhancement(cli: &Cli, app: &AppConfig) -> anyhow::Result<EnhancementConfig> {
    let mut config = match cli.preset.as_ref().or(app.preset.as_ref()) {
        Some(path) => EnhancementConfig::load(path)
            .with_context(|| format!("failed to read preset {}", path.display()))?,
        None => EnhancementConfig::default(),
    };

    let overrides: [(&Option<f32>, &mut f32); 14] = [
        (&cli.scale, &mut config.scale),
        (&cli.denoise, &mut config.denoise),
        (&cli.denoise_threshold, &mut config.denoise_threshold),
        (&cli.sharpen, &mut config.sharpen),
        (&cli.sharpen_radius, &mut config.sharpen_radius),
        (&cli.sharpen_threshold, &mut config.sharpen_threshold),
        (&cli.brightness, &mut config.brightness),
        (&cli.contrast, &mut config.contrast),
        (&cli.saturation, &mut config.saturation),
        (&cli.highlights, &mut config.highlights),
        (&cli.shadows, &mut config.shadows),
        (&cli.vibrance, &mut config.vibrance),
        (&cli.gamma, &mut config.gamma),
        (&cli.edge_enhancement, &mut config.edge_enhancement),
    ];
    for (flag, field) in overrides {
        if let Some(v) = flag {
            *field = *v;
        }
    }
    if let Some(method) = cli.method {
        config.method = method.into();
    }

    config.validate()?;
    Ok(config)
}

fn resolve_render_options(cli: &Cli, app: &AppConfig) -> anyhow::Result<RenderOptions> {
    let format = match (cli.format, app.format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(raw)) => RenderFormat::parse(raw)
            .with_context(|| format!("unknown format {:?} in config file", raw))?,
        (None, None) => RenderFormat::Png,
    };
    Ok(RenderOptions {
        format,
        jpg_quality: cli.quality.or(app.jpg_quality).unwrap_or(90).clamp(1, 100),
        png_compression: app.png_compression.unwrap_or(6).min(9),
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let app = AppConfig::load();

    let config = resolve_enhancement(&cli, &app)?;
    let options = resolve_render_options(&cli, &app)?;
    let output_dir = cli
        .output
        .clone()
        .or_else(|| app.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("enhanced"));
    let sequential = cli.sequential || app.sequential.unwrap_or(false);

    let files = export::collect_inputs(&cli.inputs)?;
    if files.is_empty() {
        bail!("No supported images found");
    }
    tracing::info!(
        files = files.len(),
        output = %output_dir.display(),
        sequential,
        "starting batch"
    );

    let started = Instant::now();
    let render = |path: &PathBuf| {
        let result = export::render_single_image(path, &config, &output_dir, options);
        match &result {
            Ok(written) => tracing::info!(
                source = %path.display(),
                output = %written.display(),
                "enhanced"
            ),
            Err(err) => tracing::error!(source = %path.display(), "{:#}", err),
        }
        result.is_ok()
    };
    let results: Vec<bool> = if sequential {
        files.iter().map(render).collect()
    } else {
        files.par_iter().map(render).collect()
    };

    let ok = results.iter().filter(|&&r| r).count();
    let failed = results.len() - ok;
    println!(
        "enhanced {} of {} images into {} ({:.2}s)",
        ok,
        results.len(),
        output_dir.display(),
        started.elapsed().as_secs_f64()
    );
    if failed > 0 {
        bail!("{} image(s) failed", failed);
    }
    Ok(())
}
