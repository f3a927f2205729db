//! `ecuity-runtime` – the per-frame engine.
//!
//! # Modules
//!
//! - [`frame_loop`] – [`FrameLoop`][frame_loop::FrameLoop]: captures a depth
//!   frame, converts it into actuator frequencies with the
//!   [`SensoryAdapter`][ecuity_perception::SensoryAdapter], and transmits the
//!   serialized command over a [`HapticLink`][ecuity_hal::HapticLink].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises the
//!   global `tracing` subscriber with an optional OTLP span exporter.  Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to enable trace export.

pub mod frame_loop;
pub mod telemetry;

pub use frame_loop::{FrameLoop, FrameLoopConfig, FrameOutcome, FrameStats};
pub use telemetry::{init_tracing, TracerProviderGuard};
