//! `ecuity-hal` – hardware boundary of the haptic pipeline.
//!
//! # Modules
//!
//! - [`camera`] – [`DepthCamera`][camera::DepthCamera] trait and the owned
//!   [`DepthFrame`][camera::DepthFrame] image type.
//! - [`haptic_link`] – [`HapticLink`][haptic_link::HapticLink] trait for the
//!   point-to-point wireless link to the actuator array.
//! - [`sim`] – simulated camera and link for headless runs and tests.

pub mod camera;
pub mod haptic_link;
pub mod sim;

pub use camera::{DepthCamera, DepthFrame};
pub use haptic_link::HapticLink;
pub use sim::{DepthScene, SimDepthCamera, SimHapticLink};
