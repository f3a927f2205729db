//! [`FrameLoop`] – the per-frame depth-to-haptics driver.
//!
//! Each tick:
//!
//! 1. **Capture** – ask the [`DepthCamera`] for the current depth frame.  A
//!    camera that has no depth yet ends the tick with
//!    [`FrameOutcome::NotYetAvailable`].
//! 2. **Translate** – hand the frame to the [`SensoryAdapter`], which returns
//!    the actuator [`FrequencyGrid`].  The frame is dropped right after.
//! 3. **Serialize** – encode the configured transmit window of the grid.
//! 4. **Transmit** – fire-and-forget the command over the [`HapticLink`] if it
//!    is connected.
//!
//! A failing tick returns its error and leaves the loop ready for the next
//! frame; [`FrameLoop::run`] logs such frames and carries on.
//!
//! # Example
//!
//! ```rust
//! use ecuity_hal::sim::{DepthScene, SimDepthCamera, SimHapticLink};
//! use ecuity_runtime::frame_loop::{FrameLoop, FrameLoopConfig};
//!
//! let config = FrameLoopConfig {
//!     haptic_rows: 1,
//!     haptic_columns: 1,
//!     threshold_mm: 1000,
//!     num_categories: 2,
//!     transmit_rows: 1,
//!     transmit_columns: 1,
//!     ..FrameLoopConfig::default()
//! };
//! let camera = SimDepthCamera::new("sim", 10, 10, DepthScene::Uniform { depth_mm: 500 });
//! let link = SimHapticLink::new("sim_link");
//!
//! let mut frames = FrameLoop::new(config, camera, link).unwrap();
//! frames.run(1);
//! assert_eq!(frames.link().sent(), &["2".to_string()]);
//! ```

use ecuity_hal::{DepthCamera, HapticLink};
use ecuity_perception::{MAX_CATEGORIES, Reducer, SensoryAdapter};
use ecuity_types::{EcuityError, FrequencyGrid};
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`FrameLoop`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLoopConfig {
    /// Actuator rows on the wearable array.
    pub haptic_rows: usize,
    /// Actuator columns on the wearable array.
    pub haptic_columns: usize,
    /// Obstacles at or beyond this distance (mm) do not vibrate.
    pub threshold_mm: u32,
    /// Number of equal distance bands below the threshold.
    pub num_categories: usize,
    /// Leading actuator rows included in each transmitted command.
    pub transmit_rows: usize,
    /// Leading actuator columns included in each transmitted command.
    pub transmit_columns: usize,
    /// Statistic used to denoise depth tiles.
    pub reducer: Reducer,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            haptic_rows: 3,
            haptic_columns: 6,
            threshold_mm: 3000,
            num_categories: 2,
            transmit_rows: 1,
            transmit_columns: 2,
            reducer: Reducer::Median,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one successful [`FrameLoop::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The camera had no depth data for this frame.
    NotYetAvailable,
    /// The command was handed to the link.
    Sent { grid: FrequencyGrid, command: String },
    /// The command was computed but the link was not connected.
    Disconnected { grid: FrequencyGrid, command: String },
}

/// Running counters kept by [`FrameLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub sent: u64,
    pub disconnected: u64,
    pub not_available: u64,
    pub failed: u64,
}

impl FrameStats {
    pub fn total(&self) -> u64 {
        self.sent + self.disconnected + self.not_available + self.failed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the depth camera, sensory adapter and haptic link frame by frame.
pub struct FrameLoop<C, L> {
    config: FrameLoopConfig,
    adapter: SensoryAdapter,
    camera: C,
    link: L,
    stats: FrameStats,
}

impl<C: DepthCamera, L: HapticLink> FrameLoop<C, L> {
    /// Construct a loop from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcuityError::InvalidArgument`] when the actuator grid is
    /// empty, the transmit window is empty or larger than the grid, or
    /// `num_categories` exceeds [`MAX_CATEGORIES`].
    pub fn new(config: FrameLoopConfig, camera: C, link: L) -> Result<Self, EcuityError> {
        let adapter = SensoryAdapter::new(config.haptic_rows, config.haptic_columns)?
            .with_reducer(config.reducer);

        if config.transmit_rows == 0
            || config.transmit_columns == 0
            || config.transmit_rows > config.haptic_rows
            || config.transmit_columns > config.haptic_columns
        {
            return Err(EcuityError::InvalidArgument(format!(
                "transmit window {}x{} must be non-empty and fit the {}x{} actuator grid",
                config.transmit_rows, config.transmit_columns, config.haptic_rows, config.haptic_columns
            )));
        }
        if config.num_categories > MAX_CATEGORIES {
            return Err(EcuityError::InvalidArgument(format!(
                "{} distance categories exceed the limit of {MAX_CATEGORIES}",
                config.num_categories
            )));
        }

        Ok(Self {
            config,
            adapter,
            camera,
            link,
            stats: FrameStats::default(),
        })
    }

    pub fn config(&self) -> &FrameLoopConfig {
        &self.config
    }

    pub fn adapter(&self) -> &SensoryAdapter {
        &self.adapter
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Run one capture → translate → transmit cycle.
    ///
    /// # Errors
    ///
    /// Propagates any camera, adapter or link error for this frame.  Nothing
    /// is retried; the next call starts a fresh frame.
    pub fn tick(&mut self) -> Result<FrameOutcome, EcuityError> {
        let outcome = self.process_frame();
        match &outcome {
            Ok(FrameOutcome::NotYetAvailable) => self.stats.not_available += 1,
            Ok(FrameOutcome::Sent { .. }) => self.stats.sent += 1,
            Ok(FrameOutcome::Disconnected { .. }) => self.stats.disconnected += 1,
            Err(_) => self.stats.failed += 1,
        }
        outcome
    }

    /// Run `frames` ticks, logging and skipping failed frames.
    pub fn run(&mut self, frames: usize) -> FrameStats {
        for _ in 0..frames {
            if let Err(e) = self.tick() {
                warn!(camera = %self.camera.id(), error = %e, "frame skipped");
            }
        }
        self.stats
    }

    fn process_frame(&mut self) -> Result<FrameOutcome, EcuityError> {
        let Some(frame) = self.camera.capture()? else {
            return Ok(FrameOutcome::NotYetAvailable);
        };

        let grid = self.adapter.attach(
            &frame,
            self.config.threshold_mm,
            self.config.num_categories,
        )?;
        drop(frame);

        let command = SensoryAdapter::motor_values_to_string(
            &grid,
            self.config.transmit_rows - 1,
            self.config.transmit_columns - 1,
        )?;

        if !self.link.is_connected() {
            debug!(link = %self.link.id(), %command, "link down; command not sent");
            return Ok(FrameOutcome::Disconnected { grid, command });
        }

        self.link.send(&command)?;
        Ok(FrameOutcome::Sent { grid, command })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
