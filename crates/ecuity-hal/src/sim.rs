//! In-process simulation of the depth camera and the haptic link.
//!
//! Lets the full pipeline run in headless tests and on a desktop without a
//! depth sensor or a paired actuator controller.
//!
//! # Example
//!
//! ```rust
//! use ecuity_hal::sim::{DepthScene, SimDepthCamera, SimHapticLink};
//! use ecuity_hal::{DepthCamera, HapticLink};
//!
//! let mut camera = SimDepthCamera::new("sim_depth", 20, 10, DepthScene::Uniform { depth_mm: 800 })
//!     .with_warmup(1);
//! assert!(camera.capture().unwrap().is_none());
//! assert!(camera.capture().unwrap().is_some());
//!
//! let mut link = SimHapticLink::new("sim_link");
//! link.send("21").unwrap();
//! assert_eq!(link.sent(), &["21".to_string()]);
//! ```

use ecuity_types::EcuityError;
use tracing::debug;

use crate::camera::{DepthCamera, DepthFrame};
use crate::haptic_link::HapticLink;

// ────────────────────────────────────────────────────────────────────────────
// Scenes
// ────────────────────────────────────────────────────────────────────────────

/// Synthetic depth content rendered by [`SimDepthCamera`].
#[derive(Debug, Clone, PartialEq)]
pub enum DepthScene {
    /// Every pixel at the same distance.
    Uniform { depth_mm: u16 },
    /// Distance grows linearly from the left edge to the right edge.
    HorizontalRamp { near_mm: u16, far_mm: u16 },
    /// A wall beyond `background_mm` with an obstacle covering the left half
    /// of the view that moves `step_mm` closer every frame, stopping at
    /// `closest_mm`.
    Approaching {
        background_mm: u16,
        start_mm: u16,
        step_mm: u16,
        closest_mm: u16,
    },
    /// Replay pre-recorded frames in a loop.
    Recorded(Vec<DepthFrame>),
}

// ────────────────────────────────────────────────────────────────────────────
// Sim camera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated depth camera rendering a [`DepthScene`].
///
/// Returns `None` for the first `warmup` captures, as real depth sensors do
/// while they converge.
pub struct SimDepthCamera {
    id: String,
    width: usize,
    height: usize,
    scene: DepthScene,
    warmup: usize,
    frame_index: usize,
}

impl SimDepthCamera {
    /// Create a simulated camera producing `width × height` frames.
    pub fn new(id: impl Into<String>, width: usize, height: usize, scene: DepthScene) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            scene,
            warmup: 0,
            frame_index: 0,
        }
    }

    /// Report "not yet available" for the first `frames` captures.
    pub fn with_warmup(mut self, frames: usize) -> Self {
        self.warmup = frames;
        self
    }

    /// Number of frames produced so far (excluding warm-up).
    pub fn frames_produced(&self) -> usize {
        self.frame_index
    }

    fn render(&self) -> Option<DepthFrame> {
        let (w, h) = (self.width, self.height);
        match &self.scene {
            DepthScene::Uniform { depth_mm } => Some(DepthFrame::uniform(w, h, *depth_mm)),
            DepthScene::HorizontalRamp { near_mm, far_mm } => {
                let (near, far) = (f64::from(*near_mm), f64::from(*far_mm));
                let span = (w.max(2) - 1) as f64;
                Some(DepthFrame::from_fn(w, h, |x, _| {
                    (near + (far - near) * x as f64 / span).round() as u16
                }))
            }
            DepthScene::Approaching {
                background_mm,
                start_mm,
                step_mm,
                closest_mm,
            } => {
                let travelled = u16::try_from(self.frame_index)
                    .unwrap_or(u16::MAX)
                    .saturating_mul(*step_mm);
                let obstacle = start_mm.saturating_sub(travelled).max(*closest_mm);
                Some(DepthFrame::from_fn(w, h, |x, _| {
                    if x < w / 2 { obstacle } else { *background_mm }
                }))
            }
            DepthScene::Recorded(frames) if frames.is_empty() => None,
            DepthScene::Recorded(frames) => Some(frames[self.frame_index % frames.len()].clone()),
        }
    }
}

impl DepthCamera for SimDepthCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Option<DepthFrame>, EcuityError> {
        if self.warmup > 0 {
            self.warmup -= 1;
            return Ok(None);
        }
        let frame = self.render();
        if frame.is_some() {
            self.frame_index += 1;
        }
        Ok(frame)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim link
// ────────────────────────────────────────────────────────────────────────────

/// A simulated haptic link that records every payload it is given.
pub struct SimHapticLink {
    id: String,
    connected: bool,
    sent: Vec<String>,
}

impl SimHapticLink {
    /// Create a connected simulated link.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: true,
            sent: Vec::new(),
        }
    }

    /// Simulate pairing or losing the link.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Payloads transmitted so far, oldest first.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }
}

impl HapticLink for SimHapticLink {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, payload: &str) -> Result<(), EcuityError> {
        if !self.connected {
            return Err(EcuityError::Transport {
                link: self.id.clone(),
                details: "link is not connected".to_string(),
            });
        }
        debug!(link = %self.id, payload, "haptic command sent");
        self.sent.push(payload.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
