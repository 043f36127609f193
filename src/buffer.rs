use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Samples per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Owned, interleaved 8-bit RGBA image.
///
/// The sample vector always holds exactly `width * height * 4` bytes and both
/// dimensions are non-zero; every constructor checks this, so stages can
/// index rows without re-validating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Transparent black buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixels = alloc_zeroed(width, height)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Buffer filled with a single color.
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let mut buf = Self::new(width, height)?;
        for px in buf.pixels.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
        Ok(buf)
    }

    /// Wraps already-decoded samples.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a buffer by evaluating `f` for every coordinate.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self>
    where
        F: Fn(u32, u32) -> [u8; 4] + Sync,
    {
        Self::from_rows(width, height, |y, row| {
            for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                px.copy_from_slice(&f(x as u32, y as u32));
            }
        })
    }

    /// Allocates a `width x height` buffer and lets `fill` write each row.
    ///
    /// Rows are handed out in parallel; `fill` receives the row index and a
    /// `width * 4` byte slice. Rows never alias, so stages can read any part
    /// of their (separate) input while filling.
    pub(crate) fn from_rows<F>(width: u32, height: u32, fill: F) -> Result<Self>
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        let mut buf = Self::new(width, height)?;
        buf.fill_rows(fill);
        Ok(buf)
    }

    /// Overwrites every row in parallel; see [`PixelBuffer::from_rows`].
    pub(crate) fn fill_rows<F>(&mut self, fill: F)
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        let stride = self.stride();
        self.pixels
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| fill(y, row));
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} buffer",
            self.width,
            self.height
        );
        let i = self.index(x as usize, y as usize);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub(crate) fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub(crate) fn row(&self, y: usize) -> &[u8] {
        let stride = self.stride();
        &self.pixels[y * stride..(y + 1) * stride]
    }

    #[inline]
    pub(crate) fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width as usize + x) * CHANNELS
    }

    /// Sample of channel `c` with coordinates clamped into the buffer.
    #[inline]
    pub(crate) fn clamped(&self, x: i64, y: i64, c: usize) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.pixels[self.index(cx, cy) + c]
    }

    /// Converts into an `image` buffer for encoding.
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        let actual = self.pixels.len();
        RgbaImage::from_raw(self.width, self.height, self.pixels).ok_or(Error::BufferSizeMismatch {
            expected: byte_len(self.width, self.height)?,
            actual,
        })
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = Error;

    fn try_from(img: RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::from_raw(width, height, img.into_raw())
    }
}

impl TryFrom<&DynamicImage> for PixelBuffer {
    type Error = Error;

    fn try_from(img: &DynamicImage) -> Result<Self> {
        Self::try_from(img.to_rgba8())
    }
}

/// Byte length of a `width x height` RGBA buffer.
pub(crate) fn byte_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions(format!(
            "{}x{} has a zero dimension",
            width, height
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| Error::InvalidDimensions(format!("{}x{} overflows", width, height)))
}

fn alloc_zeroed(width: u32, height: u32) -> Result<Vec<u8>> {
    let bytes = byte_len(width, height)?;
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(bytes)
        .map_err(|_| Error::AllocationFailure { bytes })?;
    pixels.resize(bytes, 0);
    Ok(pixels)
}

/// Rounds (ties to even) and saturates a working value to a channel sample.
#[inline]
pub(crate) fn to_channel(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}
