use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the enhancement stages.
///
/// Every stage validates its own inputs and fails fast; nothing is retried
/// and no partial output is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid parameter {name}: {value} (expected {min}..={max})")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Failed to allocate {bytes} byte output buffer")]
    AllocationFailure { bytes: usize },
}

/// Returns `InvalidParameter` unless `min <= value <= max`. NaN never passes.
pub(crate) fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value,
            min,
            max,
        })
    }
}
