use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image axis, used to report which dimension of a tiling or partition
/// request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal axis (image width, actuator columns).
    Width,
    /// Vertical axis (image height, actuator rows).
    Height,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Width => write!(f, "width"),
            Axis::Height => write!(f, "height"),
        }
    }
}

/// Global error type for the depth-to-haptics pipeline.
///
/// Every variant aborts only the current frame; nothing is retried
/// internally and no partial result accompanies an error.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EcuityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No depth image attached")]
    UnattachedResource,

    #[error("Incompatible tiling: image {axis} {extent} is not divisible by tile {axis} {tile}")]
    IncompatibleTiling { axis: Axis, extent: usize, tile: usize },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Empty input")]
    EmptyInput,

    #[error("Malformed depth image: {0}")]
    MalformedImage(String),

    #[error("Haptic link error on {link}: {details}")]
    Transport { link: String, details: String },
}

// ────────────────────────────────────────────────────────────────────────────
// DepthImage
// ────────────────────────────────────────────────────────────────────────────

/// A single-plane depth image of 16-bit unsigned millimetre samples stored in
/// native byte order.
///
/// Implemented by whatever the camera layer hands out for one frame. The
/// pipeline only ever borrows the image for the duration of one attach.
pub trait DepthImage {
    /// Image width in pixels.
    fn width(&self) -> usize;

    /// Image height in pixels.
    fn height(&self) -> usize;

    /// Distance in bytes between the starts of two consecutive rows.
    fn row_stride(&self) -> usize;

    /// Distance in bytes between two horizontally adjacent samples.
    fn pixel_stride(&self) -> usize;

    /// The raw plane bytes.
    fn plane(&self) -> &[u8];

    /// Read the depth sample at `(x, y)` in millimetres.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::MalformedImage`] when the stride-derived byte
    /// offset overflows or falls outside the plane buffer.
    fn depth_mm(&self, x: usize, y: usize) -> Result<u16, EcuityError> {
        let plane = self.plane();
        let offset = x
            .checked_mul(self.pixel_stride())
            .and_then(|col| y.checked_mul(self.row_stride())?.checked_add(col))
            .ok_or_else(|| {
                EcuityError::MalformedImage(format!(
                    "byte offset of sample ({x}, {y}) overflows with strides {}/{}",
                    self.pixel_stride(),
                    self.row_stride()
                ))
            })?;
        offset
            .checked_add(2)
            .and_then(|end| plane.get(offset..end))
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .ok_or_else(|| {
                EcuityError::MalformedImage(format!(
                    "sample ({x}, {y}) at byte {offset} exceeds plane of {} bytes",
                    plane.len()
                ))
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrequencyGrid
// ────────────────────────────────────────────────────────────────────────────

/// Row-major grid of vibration frequencies (Hz), one per haptic actuator.
///
/// A value of `0` means "do not vibrate".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    rows: usize,
    columns: usize,
    values: Vec<u32>,
}

impl FrequencyGrid {
    /// Create an all-zero grid.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            values: vec![0; rows * columns],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Frequency of the actuator at (`row`, `column`), or `None` when out of
    /// range.
    pub fn get(&self, row: usize, column: usize) -> Option<u32> {
        if row < self.rows && column < self.columns {
            Some(self.values[row * self.columns + column])
        } else {
            None
        }
    }

    /// Set the frequency of the actuator at (`row`, `column`).
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::InvalidArgument`] when the coordinates are out
    /// of range.
    pub fn set(&mut self, row: usize, column: usize, hz: u32) -> Result<(), EcuityError> {
        if row >= self.rows || column >= self.columns {
            return Err(EcuityError::InvalidArgument(format!(
                "actuator ({row}, {column}) outside {}x{} grid",
                self.rows, self.columns
            )));
        }
        self.values[row * self.columns + column] = hz;
        Ok(())
    }

    /// Iterate over one row of frequencies.
    pub fn row(&self, row: usize) -> impl Iterator<Item = u32> + '_ {
        self.values
            .chunks(self.columns.max(1))
            .nth(row)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Serialize the whole grid as unseparated decimal values, row-major.
    pub fn to_command_string(&self) -> String {
        self.values.iter().map(u32::to_string).collect()
    }
}
