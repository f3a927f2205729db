//! Generic `DepthCamera` trait and the owned depth frame it hands out.

use ecuity_types::{DepthImage, EcuityError};

/// A single-plane depth frame of native-endian `u16` millimetre samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Bytes between the starts of consecutive rows.
    pub row_stride: usize,
    /// Bytes between horizontally adjacent samples.
    pub pixel_stride: usize,
    /// Raw plane bytes.
    pub data: Vec<u8>,
}

impl DepthFrame {
    /// Build a tightly packed frame by evaluating `depth_mm(x, y)` for every
    /// pixel.
    pub fn from_fn(width: usize, height: usize, depth_mm: impl Fn(usize, usize) -> u16) -> Self {
        let mut data = Vec::with_capacity(width * height * 2);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&depth_mm(x, y).to_ne_bytes());
            }
        }
        Self {
            width,
            height,
            row_stride: width * 2,
            pixel_stride: 2,
            data,
        }
    }

    /// Build a frame in which every pixel reads `depth_mm`.
    pub fn uniform(width: usize, height: usize, depth_mm: u16) -> Self {
        Self::from_fn(width, height, |_, _| depth_mm)
    }
}

impl DepthImage for DepthFrame {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn row_stride(&self) -> usize {
        self.row_stride
    }

    fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    fn plane(&self) -> &[u8] {
        &self.data
    }
}

/// A depth-sensing camera.
///
/// Depth data is often unavailable for the first frames after start-up;
/// drivers report that as `Ok(None)` rather than as an error.
pub trait DepthCamera {
    /// Stable identifier for this camera, e.g. `"rear_tof"`.
    fn id(&self) -> &str;

    /// Acquire the depth image of the current frame, if one is available.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::MalformedImage`] if the driver produced a frame
    /// it cannot describe.
    fn capture(&mut self) -> Result<Option<DepthFrame>, EcuityError>;
}
