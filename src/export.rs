use std::path::{Path, PathBuf};

use anyhow::Context;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{
    CompressionType as PngCompressionType, FilterType as PngFilterType, PngEncoder,
};
use image::codecs::webp::WebPEncoder;

use enhancer::{EnhancementConfig, PixelBuffer};

static SUPPORTED_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    Jpg,
    Png,
    Webp,
}

impl RenderFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(RenderFormat::Jpg),
            "png" => Some(RenderFormat::Png),
            "webp" => Some(RenderFormat::Webp),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            RenderFormat::Jpg => "jpg",
            RenderFormat::Png => "png",
            RenderFormat::Webp => "webp",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub format: RenderFormat,
    pub jpg_quality: u8,
    pub png_compression: u8,
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

/// Returns `true` if the path has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Expands directories (non-recursively) into their supported images.
pub fn collect_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("read_dir failed for {}", input.display()))?
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_supported_image(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Decodes, enhances and encodes one image; returns the written path.
pub fn render_single_image(
    source_path: &Path,
    config: &EnhancementConfig,
    output_dir: &Path,
    options: RenderOptions,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let input = image::open(source_path)
        .with_context(|| format!("decode failed for {}", source_path.display()))?;
    let buf = PixelBuffer::try_from(&input)?;
    let enhanced = enhancer::enhance(buf, config)
        .with_context(|| format!("enhance failed for {}", source_path.display()))?;
    let rendered = DynamicImage::ImageRgba8(enhanced.into_rgba_image()?);
    let output_path = build_output_path(source_path, output_dir, options.format);
    write_rendered_image(&rendered, &output_path, options)
        .with_context(|| format!("encode failed for {}", output_path.display()))?;
    Ok(output_path)
}

fn build_output_path(source_path: &Path, output_dir: &Path, format: RenderFormat) -> PathBuf {
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let base = output_dir.join(format!("{}.{}", stem, format.extension()));
    if !base.exists() {
        return base;
    }
    for n in 2..10000 {
        let candidate = output_dir.join(format!("{}-{}.{}", stem, n, format.extension()));
        if !candidate.exists() {
            return candidate;
        }
    }
    output_dir.join(format!("{}-final.{}", stem, format.extension()))
}

fn write_rendered_image(
    rendered: &DynamicImage,
    output_path: &Path,
    options: RenderOptions,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(output_path)?;
    let writer = std::io::BufWriter::new(file);
    match options.format {
        RenderFormat::Jpg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(rendered.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(writer, options.jpg_quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        RenderFormat::Png => {
            let compression = PngCompressionType::Level(options.png_compression.min(9));
            let encoder =
                PngEncoder::new_with_quality(writer, compression, PngFilterType::Adaptive);
            rendered.write_with_encoder(encoder)?;
        }
        RenderFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(writer);
            rendered.write_with_encoder(encoder)?;
        }
    }
    Ok(())
}
