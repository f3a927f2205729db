//! Depth denoising by non-overlapping tile reduction.
//!
//! A [`DepthProcessor`] borrows one [`DepthImage`] for the duration of a
//! frame and produces a [`KernelCover`]: a grid the size of the source image
//! in which every pixel of a `tile_width × tile_height` tile carries the same
//! reduced value (by default the tile median).
//!
//! # Example
//!
//! ```rust
//! use ecuity_perception::depth_processor::{DepthProcessor, Reducer};
//! use ecuity_types::DepthImage;
//!
//! struct Flat;
//! impl DepthImage for Flat {
//!     fn width(&self) -> usize { 10 }
//!     fn height(&self) -> usize { 10 }
//!     fn row_stride(&self) -> usize { 20 }
//!     fn pixel_stride(&self) -> usize { 2 }
//!     fn plane(&self) -> &[u8] {
//!         static BYTES: [u8; 200] = [0; 200];
//!         &BYTES
//!     }
//! }
//!
//! let image = Flat;
//! let mut processor = DepthProcessor::new();
//! processor.attach(&image);
//! let cover = processor.compute_kernel_cover(5, 5, Reducer::Median).unwrap();
//! assert_eq!(cover.get(9, 9), Some(0.0));
//! ```

use std::str::FromStr;

use ecuity_types::{Axis, DepthImage, EcuityError};
use tracing::debug;

use crate::math_tools;

// ────────────────────────────────────────────────────────────────────────────
// Reducer
// ────────────────────────────────────────────────────────────────────────────

/// Statistic applied to the raw samples of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// Median of the tile; robust against speckle and dropouts.
    #[default]
    Median,
    /// Arithmetic mean of the tile.
    Mean,
    /// Nearest sample in the tile.
    Min,
}

impl Reducer {
    /// Reduce `samples` to a single descriptor.  The slice may be reordered.
    pub fn apply(self, samples: &mut [u16]) -> Result<f64, EcuityError> {
        match self {
            Reducer::Median => math_tools::median(samples),
            Reducer::Mean => math_tools::mean(samples),
            Reducer::Min => math_tools::min(samples),
        }
    }
}

impl FromStr for Reducer {
    type Err = EcuityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(Reducer::Median),
            "mean" => Ok(Reducer::Mean),
            "min" => Ok(Reducer::Min),
            other => Err(EcuityError::UnsupportedOperation(format!(
                "unknown reducer '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reducer::Median => write!(f, "median"),
            Reducer::Mean => write!(f, "mean"),
            Reducer::Min => write!(f, "min"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// KernelCover
// ────────────────────────────────────────────────────────────────────────────

/// Denoised depth grid at the native resolution of its source image.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelCover {
    width: usize,
    height: usize,
    /// Row-major descriptors, `width * height` long.
    values: Vec<f64>,
}

impl KernelCover {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Descriptor at pixel (`x`, `y`), or `None` outside the cover.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Descriptors of pixels `x_range` in row `y`.
    ///
    /// # Panics
    ///
    /// Panics when the range or row lies outside the cover.
    pub fn row_span(&self, y: usize, x_range: std::ops::Range<usize>) -> &[f64] {
        let start = y * self.width;
        &self.values[start + x_range.start..start + x_range.end]
    }

    fn fill_tile(&mut self, x0: usize, y0: usize, tile_width: usize, tile_height: usize, v: f64) {
        for y in y0..y0 + tile_height {
            let start = y * self.width + x0;
            self.values[start..start + tile_width].fill(v);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DepthProcessor
// ────────────────────────────────────────────────────────────────────────────

/// Applies a tiling reducer to the currently attached depth image.
///
/// The processor never outlives the frame whose image it borrows; a new
/// image replaces the previous one on [`DepthProcessor::attach`].
#[derive(Default)]
pub struct DepthProcessor<'a> {
    image: Option<&'a dyn DepthImage>,
    width: usize,
    height: usize,
}

impl<'a> DepthProcessor<'a> {
    /// Create a processor with no image attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `image` as the source for the next cover computation.
    pub fn attach(&mut self, image: &'a dyn DepthImage) {
        self.width = image.width();
        self.height = image.height();
        self.image = Some(image);
    }

    /// `true` once an image has been attached.
    pub fn is_attached(&self) -> bool {
        self.image.is_some()
    }

    /// Dimensions `(width, height)` of the attached image.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Reduce every non-overlapping `tile_width × tile_height` tile of the
    /// attached image with `reducer`.
    ///
    /// # Errors
    ///
    /// - [`EcuityError::UnattachedResource`] if no image is attached.
    /// - [`EcuityError::IncompatibleTiling`] if a tile dimension is zero or
    ///   does not divide the matching image dimension.
    /// - [`EcuityError::MalformedImage`] if the plane is too short for the
    ///   declared geometry.
    pub fn compute_kernel_cover(
        &self,
        tile_width: usize,
        tile_height: usize,
        reducer: Reducer,
    ) -> Result<KernelCover, EcuityError> {
        let image = self.image.ok_or(EcuityError::UnattachedResource)?;
        check_tiling(Axis::Width, self.width, tile_width)?;
        check_tiling(Axis::Height, self.height, tile_height)?;

        let mut cover = KernelCover {
            width: self.width,
            height: self.height,
            values: vec![0.0; self.width * self.height],
        };
        let mut samples = Vec::with_capacity(tile_width * tile_height);

        for y0 in (0..self.height).step_by(tile_height) {
            for x0 in (0..self.width).step_by(tile_width) {
                samples.clear();
                for y in y0..y0 + tile_height {
                    for x in x0..x0 + tile_width {
                        samples.push(image.depth_mm(x, y)?);
                    }
                }
                let descriptor = reducer.apply(&mut samples)?;
                cover.fill_tile(x0, y0, tile_width, tile_height, descriptor);
            }
        }

        debug!(
            width = self.width,
            height = self.height,
            tile_width,
            tile_height,
            %reducer,
            "kernel cover computed"
        );
        Ok(cover)
    }
}

fn check_tiling(axis: Axis, extent: usize, tile: usize) -> Result<(), EcuityError> {
    if tile == 0 || extent % tile != 0 {
        return Err(EcuityError::IncompatibleTiling { axis, extent, tile });
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Depth image over an owned buffer with optional row padding.
    struct TestImage {
        width: usize,
        height: usize,
        row_stride: usize,
        bytes: Vec<u8>,
    }

    impl TestImage {
        fn from_fn(width: usize, height: usize, padding: usize, f: impl Fn(usize, usize) -> u16) -> Self {
            let row_stride = width * 2 + padding;
            let mut bytes = vec![0xAAu8; row_stride * height];
            for y in 0..height {
                for x in 0..width {
                    let off = y * row_stride + x * 2;
                    bytes[off..off + 2].copy_from_slice(&f(x, y).to_ne_bytes());
                }
            }
            Self {
                width,
                height,
                row_stride,
                bytes,
            }
        }
    }

    impl DepthImage for TestImage {
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
            2
        }
        fn plane(&self) -> &[u8] {
            &self.bytes
        }
    }

    fn quadrant(x: usize, y: usize) -> u16 {
        match (x < 5, y < 5) {
            (true, true) => 100,
            (false, true) => 200,
            (true, false) => 300,
            (false, false) => 400,
        }
    }

    #[test]
    fn unattached_processor_fails() {
        let processor = DepthProcessor::new();
        assert!(!processor.is_attached());
        assert_eq!(
            processor.compute_kernel_cover(5, 5, Reducer::Median),
            Err(EcuityError::UnattachedResource)
        );
    }

    #[test]
    fn non_dividing_tile_fails() {
        let image = TestImage::from_fn(10, 10, 0, quadrant);
        let mut processor = DepthProcessor::new();
        processor.attach(&image);

        let err = processor
            .compute_kernel_cover(3, 3, Reducer::Median)
            .unwrap_err();
        assert_eq!(
            err,
            EcuityError::IncompatibleTiling {
                axis: Axis::Width,
                extent: 10,
                tile: 3
            }
        );

        let err = processor
            .compute_kernel_cover(5, 3, Reducer::Median)
            .unwrap_err();
        assert!(matches!(
            err,
            EcuityError::IncompatibleTiling {
                axis: Axis::Height,
                ..
            }
        ));
    }

    #[test]
    fn zero_tile_is_incompatible() {
        let image = TestImage::from_fn(10, 10, 0, quadrant);
        let mut processor = DepthProcessor::new();
        processor.attach(&image);
        assert!(matches!(
            processor.compute_kernel_cover(0, 5, Reducer::Median),
            Err(EcuityError::IncompatibleTiling { tile: 0, .. })
        ));
    }

    #[test]
    fn dividing_tile_yields_four_uniform_blocks() {
        let image = TestImage::from_fn(10, 10, 0, quadrant);
        let mut processor = DepthProcessor::new();
        processor.attach(&image);
        let cover = processor.compute_kernel_cover(5, 5, Reducer::Median).unwrap();

        assert_eq!((cover.width(), cover.height()), (10, 10));
        let mut distinct = BTreeSet::new();
        for y in 0..10 {
            for x in 0..10 {
                let v = cover.get(x, y).unwrap();
                assert_eq!(v, f64::from(quadrant(x, y)));
                distinct.insert(v as u64);
            }
        }
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn median_suppresses_speckle() {
        // One bright pixel per tile must not move the tile median.
        let image = TestImage::from_fn(10, 5, 0, |x, y| if (x, y) == (2, 2) { 9000 } else { 800 });
        let mut processor = DepthProcessor::new();
        processor.attach(&image);

        let cover = processor.compute_kernel_cover(5, 5, Reducer::Median).unwrap();
        assert_eq!(cover.get(2, 2), Some(800.0));

        let nearest = processor.compute_kernel_cover(5, 5, Reducer::Min).unwrap();
        assert_eq!(nearest.get(0, 0), Some(800.0));

        let mean = processor.compute_kernel_cover(5, 5, Reducer::Mean).unwrap();
        assert_eq!(mean.get(4, 4), Some((24.0 * 800.0 + 9000.0) / 25.0));
    }

    #[test]
    fn row_padding_is_skipped_via_stride() {
        let image = TestImage::from_fn(5, 5, 6, |x, _| 1000 + x as u16);
        let mut processor = DepthProcessor::new();
        processor.attach(&image);
        let cover = processor.compute_kernel_cover(5, 5, Reducer::Median).unwrap();
        assert_eq!(cover.get(0, 0), Some(1002.0));
    }

    #[test]
    fn reattach_replaces_image() {
        let near = TestImage::from_fn(5, 5, 0, |_, _| 100);
        let far = TestImage::from_fn(10, 5, 0, |_, _| 4000);
        let mut processor = DepthProcessor::new();
        processor.attach(&near);
        processor.attach(&far);
        assert_eq!(processor.dimensions(), (10, 5));
        let cover = processor.compute_kernel_cover(5, 5, Reducer::Median).unwrap();
        assert_eq!(cover.get(9, 4), Some(4000.0));
    }

    #[test]
    fn truncated_plane_is_malformed() {
        let mut image = TestImage::from_fn(5, 5, 0, |_, _| 100);
        image.bytes.truncate(40);
        let mut processor = DepthProcessor::new();
        processor.attach(&image);
        assert!(matches!(
            processor.compute_kernel_cover(5, 5, Reducer::Median),
            Err(EcuityError::MalformedImage(_))
        ));
    }

    #[test]
    fn reducer_parsing() {
        assert_eq!("MEDIAN".parse::<Reducer>().unwrap(), Reducer::Median);
        assert_eq!(" min ".parse::<Reducer>().unwrap(), Reducer::Min);
        assert!(matches!(
            "mode".parse::<Reducer>(),
            Err(EcuityError::UnsupportedOperation(_))
        ));
    }
}
