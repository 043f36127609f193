pub mod color;
pub mod denoise;
pub mod edges;
pub mod pipeline;
pub mod resample;
pub mod sharpness;
