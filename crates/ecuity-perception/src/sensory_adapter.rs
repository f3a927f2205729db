//! Per-frame translation of depth images into haptic frequency commands.
//!
//! The [`SensoryAdapter`] owns the layout of the wearable actuator array
//! (`rows × columns` motors).  For every frame it:
//!
//! 1. reduces the depth image to a [`KernelCover`] using 5×5 median tiles;
//! 2. splits the cover into one pixel region per actuator (the
//!    [`Partition`]s are computed on the first frame and cached);
//! 3. buckets every pixel of a region into a distance category and turns the
//!    dominant category into a vibration frequency.
//!
//! The resulting [`FrequencyGrid`] is serialized with
//! [`SensoryAdapter::motor_values_to_string`] before it goes out over the
//! haptic link.
//!
//! # Example
//!
//! ```rust
//! use ecuity_perception::sensory_adapter::Partition;
//!
//! // The remainder of 10 / 3 is folded into the first segment.
//! let p = Partition::split(10, 3).unwrap();
//! assert_eq!(p.boundaries(), &[0, 4, 7, 10]);
//! ```

use std::ops::Range;

use ecuity_types::{DepthImage, EcuityError, FrequencyGrid};
use tracing::{debug, info, warn};

use crate::depth_processor::{DepthProcessor, KernelCover, Reducer};
use crate::math_tools;

/// Side length of the square denoising tile applied to every frame.
pub const KERNEL_SIZE: usize = 5;

/// Upper bound on distance categories.  Depth samples are 16-bit
/// millimetres, so finer bands could never be told apart.
pub const MAX_CATEGORIES: usize = u16::MAX as usize;

/// Multiplier applied when converting a dominant category to Hz.
const FREQUENCY_MULTIPLIER: u32 = 1;

// ────────────────────────────────────────────────────────────────────────────
// Partition
// ────────────────────────────────────────────────────────────────────────────

/// Split of one image axis into contiguous, non-overlapping pixel ranges,
/// one per actuator along that axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    boundaries: Vec<usize>,
}

impl Partition {
    /// Split `extent` pixels into `segments` ranges of `extent / segments`
    /// pixels each, with the whole remainder added to the first range.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::InvalidArgument`] when `segments` is zero or
    /// larger than `extent`.
    pub fn split(extent: usize, segments: usize) -> Result<Self, EcuityError> {
        if segments == 0 || segments > extent {
            return Err(EcuityError::InvalidArgument(format!(
                "cannot split {extent} pixels into {segments} segments"
            )));
        }

        let per_segment = extent / segments;
        let remainder = extent % segments;

        let mut boundaries = Vec::with_capacity(segments + 1);
        boundaries.push(0);
        boundaries.push(per_segment + remainder);
        for _ in 1..segments {
            let last = boundaries[boundaries.len() - 1];
            boundaries.push(last + per_segment);
        }
        Ok(Self { boundaries })
    }

    /// The `segments + 1` boundaries; segment `i` spans
    /// `boundaries[i]..boundaries[i + 1]`.
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn segments(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Total number of pixels covered.
    pub fn extent(&self) -> usize {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// Pixel range of segment `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= self.segments()`.
    pub fn range(&self, index: usize) -> Range<usize> {
        self.boundaries[index]..self.boundaries[index + 1]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// Actuator regions cached for a fixed image size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    /// Image width the partitions were computed for.
    pub width: usize,
    /// Image height the partitions were computed for.
    pub height: usize,
    /// Split of the image height into actuator rows.
    pub rows: Partition,
    /// Split of the image width into actuator columns.
    pub columns: Partition,
}

impl GridLayout {
    fn compute(width: usize, height: usize, rows: usize, columns: usize) -> Result<Self, EcuityError> {
        Ok(Self {
            width,
            height,
            rows: Partition::split(height, rows)?,
            columns: Partition::split(width, columns)?,
        })
    }

    fn fits(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height
    }
}

/// Adapter state: no partition yet, or partitions cached for one image size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Ready(GridLayout),
}

// ────────────────────────────────────────────────────────────────────────────
// SensoryAdapter
// ────────────────────────────────────────────────────────────────────────────

/// Converts depth frames into a [`FrequencyGrid`] shaped like the actuator
/// array.
#[derive(Debug)]
pub struct SensoryAdapter {
    rows: usize,
    columns: usize,
    reducer: Reducer,
    state: AdapterState,
}

impl SensoryAdapter {
    /// Create an adapter for a `rows × columns` actuator array.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::InvalidArgument`] if either dimension is zero.
    pub fn new(rows: usize, columns: usize) -> Result<Self, EcuityError> {
        if rows < 1 || columns < 1 {
            return Err(EcuityError::InvalidArgument(format!(
                "actuator grid must be at least 1x1, got {rows}x{columns}"
            )));
        }
        Ok(Self {
            rows,
            columns,
            reducer: Reducer::Median,
            state: AdapterState::Uninitialized,
        })
    }

    /// Replace the tile reducer (median unless configured otherwise).
    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AdapterState::Ready(_))
    }

    /// Drop the cached partitions; the next [`attach`](Self::attach)
    /// recomputes them.
    pub fn reset(&mut self) {
        self.state = AdapterState::Uninitialized;
    }

    /// Process one depth frame and return the actuator frequencies.
    ///
    /// `threshold_mm` is the distance from which obstacles are ignored and
    /// `num_categories` the number of equal distance bands below it.  The
    /// image is only borrowed for the duration of this call.
    ///
    /// A frame whose size differs from the cached layout invalidates the
    /// cached partitions, which are then recomputed for the new size.
    ///
    /// # Errors
    ///
    /// - [`EcuityError::InvalidArgument`] when `num_categories` exceeds
    ///   [`MAX_CATEGORIES`].
    /// - [`EcuityError::IncompatibleTiling`] when the image size is not a
    ///   multiple of [`KERNEL_SIZE`].
    /// - [`EcuityError::InvalidArgument`] when an image axis has fewer pixels
    ///   than actuators along it.
    /// - [`EcuityError::MalformedImage`] when the plane is shorter than its
    ///   declared geometry.
    pub fn attach(
        &mut self,
        image: &dyn DepthImage,
        threshold_mm: u32,
        num_categories: usize,
    ) -> Result<FrequencyGrid, EcuityError> {
        if num_categories > MAX_CATEGORIES {
            return Err(EcuityError::InvalidArgument(format!(
                "{num_categories} distance categories exceed the limit of {MAX_CATEGORIES}"
            )));
        }

        let mut processor = DepthProcessor::new();
        processor.attach(image);
        let cover = processor.compute_kernel_cover(KERNEL_SIZE, KERNEL_SIZE, self.reducer)?;

        let (width, height) = (cover.width(), cover.height());
        let layout = match std::mem::replace(&mut self.state, AdapterState::Uninitialized) {
            AdapterState::Ready(layout) if layout.fits(width, height) => layout,
            previous => {
                if let AdapterState::Ready(stale) = &previous {
                    warn!(
                        cached_width = stale.width,
                        cached_height = stale.height,
                        width,
                        height,
                        "depth image size changed; recomputing actuator partition"
                    );
                }
                let layout = GridLayout::compute(width, height, self.rows, self.columns)?;
                info!(
                    rows = ?layout.rows.boundaries(),
                    columns = ?layout.columns.boundaries(),
                    "actuator partition computed"
                );
                layout
            }
        };

        let grid = haptic_frequencies(&cover, &layout, threshold_mm, num_categories);
        self.state = AdapterState::Ready(layout);
        let grid = grid?;
        debug!(command = %grid.to_command_string(), "frame converted");
        Ok(grid)
    }

    /// Concatenate the decimal frequencies of rows `0..=row_limit` and
    /// columns `0..=column_limit`, row-major, without separators.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::InvalidArgument`] when a limit lies outside
    /// `grid`.
    pub fn motor_values_to_string(
        grid: &FrequencyGrid,
        row_limit: usize,
        column_limit: usize,
    ) -> Result<String, EcuityError> {
        if row_limit >= grid.rows() || column_limit >= grid.columns() {
            return Err(EcuityError::InvalidArgument(format!(
                "window 0..={row_limit} x 0..={column_limit} exceeds {}x{} grid",
                grid.rows(),
                grid.columns()
            )));
        }

        let mut out = String::new();
        for row in 0..=row_limit {
            for hz in grid.row(row).take(column_limit + 1) {
                out.push_str(&hz.to_string());
            }
        }
        Ok(out)
    }
}

fn haptic_frequencies(
    cover: &KernelCover,
    layout: &GridLayout,
    threshold_mm: u32,
    num_categories: usize,
) -> Result<FrequencyGrid, EcuityError> {
    let mut grid = FrequencyGrid::new(layout.rows.segments(), layout.columns.segments());
    let mut counts = vec![0u32; num_categories + 1];

    for row in 0..layout.rows.segments() {
        for column in 0..layout.columns.segments() {
            counts.fill(0);
            let xs = layout.columns.range(column);
            for y in layout.rows.range(row) {
                for &depth in cover.row_span(y, xs.clone()) {
                    counts[math_tools::distance_to_category(depth, threshold_mm, num_categories)] += 1;
                }
            }
            let hz = math_tools::category_counts_to_frequency(
                num_categories,
                &counts,
                FREQUENCY_MULTIPLIER,
            )?;
            grid.set(row, column, hz)?;
        }
    }
    Ok(grid)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct TestImage {
        width: usize,
        height: usize,
        bytes: Vec<u8>,
    }

    impl TestImage {
        fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> u16) -> Self {
            let mut bytes = Vec::with_capacity(width * height * 2);
            for y in 0..height {
                for x in 0..width {
                    bytes.extend_from_slice(&f(x, y).to_ne_bytes());
                }
            }
            Self {
                width,
                height,
                bytes,
            }
        }

        fn uniform(width: usize, height: usize, mm: u16) -> Self {
            Self::from_fn(width, height, |_, _| mm)
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
            self.width * 2
        }
        fn pixel_stride(&self) -> usize {
            2
        }
        fn plane(&self) -> &[u8] {
            &self.bytes
        }
    }

    #[test]
    fn partition_folds_remainder_into_first_segment() {
        let p = Partition::split(10, 3).unwrap();
        assert_eq!(p.boundaries(), &[0, 4, 7, 10]);
        assert_eq!(p.segments(), 3);
        assert_eq!(p.extent(), 10);
        assert_eq!(p.range(0), 0..4);
        assert_eq!(p.range(2), 7..10);
    }

    #[test]
    fn partition_even_split() {
        let p = Partition::split(120, 6).unwrap();
        assert_eq!(p.boundaries(), &[0, 20, 40, 60, 80, 100, 120]);
    }

    #[test]
    fn partition_is_strictly_increasing() {
        for extent in 1..40 {
            for segments in 1..=extent {
                let p = Partition::split(extent, segments).unwrap();
                assert_eq!(p.boundaries()[0], 0);
                assert_eq!(p.extent(), extent);
                assert!(p.boundaries().windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn partition_rejects_more_segments_than_pixels() {
        assert!(matches!(
            Partition::split(2, 3),
            Err(EcuityError::InvalidArgument(_))
        ));
        assert!(Partition::split(10, 0).is_err());
    }

    #[test]
    fn new_rejects_empty_grid() {
        assert!(matches!(
            SensoryAdapter::new(0, 3),
            Err(EcuityError::InvalidArgument(_))
        ));
        assert!(SensoryAdapter::new(3, 0).is_err());
        assert!(SensoryAdapter::new(1, 1).is_ok());
    }

    #[test]
    fn uniform_near_frame_vibrates_fastest() {
        let image = TestImage::uniform(10, 10, 500);
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();
        let grid = adapter.attach(&image, 1000, 2).unwrap();
        assert_eq!(grid.get(0, 0), Some(2));
        assert_eq!(
            SensoryAdapter::motor_values_to_string(&grid, 0, 0).unwrap(),
            "2"
        );
    }

    #[test]
    fn frame_beyond_threshold_is_silent() {
        let image = TestImage::uniform(10, 10, 1000);
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();
        let grid = adapter.attach(&image, 1000, 2).unwrap();
        assert_eq!(grid.get(0, 0), Some(0));
    }

    #[test]
    fn obstacle_on_the_left_only_drives_left_column() {
        // 20x10 image, 1x2 actuators: left half at 400mm, right half far.
        let image = TestImage::from_fn(20, 10, |x, _| if x < 10 { 400 } else { 5000 });
        let mut adapter = SensoryAdapter::new(1, 2).unwrap();
        let grid = adapter.attach(&image, 3000, 3).unwrap();
        assert_eq!(grid.get(0, 0), Some(3));
        assert_eq!(grid.get(0, 1), Some(0));
        assert_eq!(grid.to_command_string(), "30");
    }

    #[test]
    fn rows_map_to_image_height() {
        // Top half near, bottom half mid-range; 2x1 actuators.
        let image = TestImage::from_fn(10, 20, |_, y| if y < 10 { 100 } else { 1500 });
        let mut adapter = SensoryAdapter::new(2, 1).unwrap();
        let grid = adapter.attach(&image, 2000, 2).unwrap();
        assert_eq!(grid.get(0, 0), Some(2));
        assert_eq!(grid.get(1, 0), Some(1));
    }

    #[test]
    fn first_attach_caches_partition() {
        let image = TestImage::uniform(30, 15, 800);
        let mut adapter = SensoryAdapter::new(3, 6).unwrap();
        assert_eq!(adapter.state(), &AdapterState::Uninitialized);

        adapter.attach(&image, 3000, 2).unwrap();
        let AdapterState::Ready(layout) = adapter.state().clone() else {
            panic!("adapter must be ready after first attach");
        };
        assert_eq!(layout.rows.boundaries(), &[0, 5, 10, 15]);
        assert_eq!(layout.columns.boundaries(), &[0, 5, 10, 15, 20, 25, 30]);

        adapter.attach(&image, 1000, 4).unwrap();
        assert_eq!(adapter.state(), &AdapterState::Ready(layout));
    }

    #[test]
    fn size_change_recomputes_partition() {
        let mut adapter = SensoryAdapter::new(1, 2).unwrap();
        adapter.attach(&TestImage::uniform(10, 5, 800), 3000, 2).unwrap();
        adapter.attach(&TestImage::uniform(20, 5, 800), 3000, 2).unwrap();
        let AdapterState::Ready(layout) = adapter.state() else {
            panic!("adapter must stay ready");
        };
        assert_eq!(layout.columns.boundaries(), &[0, 10, 20]);
    }

    #[test]
    fn reset_returns_to_uninitialized() {
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();
        adapter.attach(&TestImage::uniform(5, 5, 800), 3000, 2).unwrap();
        assert!(adapter.is_ready());
        adapter.reset();
        assert!(!adapter.is_ready());
    }

    #[test]
    fn failed_frame_leaves_adapter_uninitialized() {
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();
        let err = adapter.attach(&TestImage::uniform(7, 5, 800), 3000, 2).unwrap_err();
        assert!(matches!(err, EcuityError::IncompatibleTiling { .. }));
        assert!(!adapter.is_ready());

        // Fewer pixel columns than actuators.
        let mut wide = SensoryAdapter::new(1, 6).unwrap();
        let err = wide.attach(&TestImage::uniform(5, 5, 800), 3000, 2).unwrap_err();
        assert!(matches!(err, EcuityError::InvalidArgument(_)));
        assert!(!wide.is_ready());
    }

    #[test]
    fn zero_categories_never_vibrates() {
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();
        let grid = adapter.attach(&TestImage::uniform(5, 5, 10), 3000, 0).unwrap();
        assert_eq!(grid.get(0, 0), Some(0));
    }

    #[test]
    fn min_reducer_reports_nearest_sample() {
        // A single near pixel per tile dominates only with the min reducer.
        let image = TestImage::from_fn(5, 5, |x, y| if (x, y) == (0, 0) { 200 } else { 2500 });
        let mut median = SensoryAdapter::new(1, 1).unwrap();
        let mut nearest = SensoryAdapter::new(1, 1).unwrap().with_reducer(Reducer::Min);
        assert_eq!(median.attach(&image, 3000, 3).unwrap().get(0, 0), Some(1));
        assert_eq!(nearest.attach(&image, 3000, 3).unwrap().get(0, 0), Some(3));
    }

    #[test]
    fn window_serialization_is_row_major() {
        let mut grid = FrequencyGrid::new(3, 6);
        grid.set(0, 0, 2).unwrap();
        grid.set(0, 1, 1).unwrap();
        grid.set(1, 0, 12).unwrap();
        grid.set(1, 1, 3).unwrap();
        assert_eq!(
            SensoryAdapter::motor_values_to_string(&grid, 0, 1).unwrap(),
            "21"
        );
        assert_eq!(
            SensoryAdapter::motor_values_to_string(&grid, 1, 1).unwrap(),
            "21123"
        );
        assert_eq!(
            SensoryAdapter::motor_values_to_string(&grid, 2, 5).unwrap(),
            grid.to_command_string()
        );
    }

    #[test]
    fn window_outside_grid_is_rejected() {
        let grid = FrequencyGrid::new(3, 6);
        assert!(matches!(
            SensoryAdapter::motor_values_to_string(&grid, 3, 0),
            Err(EcuityError::InvalidArgument(_))
        ));
        assert!(SensoryAdapter::motor_values_to_string(&grid, 0, 6).is_err());
    }

    #[test]
    fn excessive_category_count_is_rejected_before_processing() {
        let image = TestImage::from_fn(5, 5, |_, _| 1000);
        let mut adapter = SensoryAdapter::new(1, 1).unwrap();

        for categories in [MAX_CATEGORIES + 1, usize::MAX] {
            assert!(matches!(
                adapter.attach(&image, 3000, categories),
                Err(EcuityError::InvalidArgument(_))
            ));
        }
        assert!(!adapter.is_ready());

        let grid = adapter.attach(&image, 3000, MAX_CATEGORIES).unwrap();
        assert!(grid.get(0, 0).is_some());
        assert!(adapter.is_ready());
    }
}
