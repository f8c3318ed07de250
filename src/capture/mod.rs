//! Screenshot gathering from a recorded broadcast.
//!
//! This module provides:
//! - Overlay cropping and red-flag detection (`OverlayGeometry`)
//! - The frame schedule (`SampleSchedule`)
//! - Frame input (`FrameSource`, `ImageSequence`)
//! - Screenshot pair output (`gather_screenshots`)

pub mod overlay;
pub mod sampler;

pub use overlay::OverlayGeometry;
pub use sampler::{gather_screenshots, FrameSource, GatherSummary, ImageSequence, SampleSchedule};
