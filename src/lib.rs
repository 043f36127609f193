//! Multi-stage raster enhancement: upscaling, edge-preserving denoise, color
//! grading, Sobel edge boost and unsharp masking over owned RGBA buffers.
//!
//! Every stage is a pure function from one [`PixelBuffer`] to a new one and
//! can be called from any number of threads at once.
//!
//! ```
//! use enhancer::{EnhancementConfig, Method, PixelBuffer};
//!
//! let buf = PixelBuffer::from_pixel(4, 4, [128, 128, 128, 255]).unwrap();
//! let config = EnhancementConfig {
//!     scale: 2.0,
//!     method: Method::Bicubic,
//!     ..Default::default()
//! };
//! let out = enhancer::enhance(buf, &config).unwrap();
//! assert_eq!(out.dimensions(), (8, 8));
//! ```

pub mod buffer;
pub mod error;
pub mod processing;
pub mod state;

pub use buffer::PixelBuffer;
pub use error::{Error, Result};
pub use processing::pipeline::{apply as enhance, apply_batch as enhance_batch};
pub use state::{EnhancementConfig, Method};
