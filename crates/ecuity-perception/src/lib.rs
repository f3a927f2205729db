//! `ecuity-perception` – depth-to-haptics translation.
//!
//! Turns a per-pixel depth image into a coarse grid of vibration frequencies
//! for a wearable array of haptic actuators.
//!
//! # Modules
//!
//! - [`math_tools`] – median, distance-category and category-to-frequency
//!   primitives.
//! - [`depth_processor`] – [`DepthProcessor`][depth_processor::DepthProcessor]:
//!   denoises the attached depth image by reducing non-overlapping tiles into
//!   a [`KernelCover`][depth_processor::KernelCover].
//! - [`sensory_adapter`] – [`SensoryAdapter`][sensory_adapter::SensoryAdapter]:
//!   partitions the cover into one region per actuator, buckets pixels by
//!   distance, and produces the per-frame
//!   [`FrequencyGrid`][ecuity_types::FrequencyGrid].

pub mod depth_processor;
pub mod math_tools;
pub mod sensory_adapter;

pub use depth_processor::{DepthProcessor, KernelCover, Reducer};
pub use sensory_adapter::{
    AdapterState, GridLayout, KERNEL_SIZE, MAX_CATEGORIES, Partition, SensoryAdapter,
};
