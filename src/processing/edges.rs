use crate::buffer::{CHANNELS, PixelBuffer, to_channel};
use crate::error::{Result, check_range};
use crate::state::EnhancementConfig;

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

pub fn apply(buf: PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    if skips(config, buf.width(), buf.height()) {
        return Ok(buf);
    }
    enhance_edges(&buf, config.edge_enhancement)
}

pub fn skips(config: &EnhancementConfig, _width: u32, _height: u32) -> bool {
    config.edge_enhancement.abs() < 0.001
}

/// Adds `strength`% of the Sobel gradient magnitude to each RGB channel.
///
/// Only interior pixels are touched; the one-pixel frame and alpha are copied.
pub fn enhance_edges(buf: &PixelBuffer, strength: f32) -> Result<PixelBuffer> {
    check_range("edge_enhancement", strength, 0.0, 100.0)?;

    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let gain = strength / 100.0;
    let src = buf.as_raw();

    PixelBuffer::from_rows(buf.width(), buf.height(), |y, out| {
        out.copy_from_slice(buf.row(y));
        if y == 0 || y + 1 >= h {
            return;
        }
        for x in 1..w.saturating_sub(1) {
            let i = buf.index(x, y);
            for c in 0..3 {
                let mut gx = 0.0f32;
                let mut gy = 0.0f32;
                for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(&SOBEL_Y).enumerate() {
                    for kx in 0..3 {
                        let v = src[buf.index(x + kx - 1, y + ky - 1) + c] as f32;
                        gx += row_x[kx] * v;
                        gy += row_y[kx] * v;
                    }
                }
                let magnitude = (gx * gx + gy * gy).sqrt();
                out[x * CHANNELS + c] = to_channel(src[i + c] as f32 + magnitude * gain);
            }
        }
    })
}
