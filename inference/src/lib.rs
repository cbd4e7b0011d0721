//! SiamRPN Video Tracker Library
//!
//! Tracks a fixed set of objects through a video with one SiamRPN tracker per
//! object, draws each object's box and label, and writes the annotated video.
//! The network runs on ONNX Runtime (CUDA when available, CPU otherwise);
//! video I/O uses OpenCV behind the `opencv` feature.

pub mod cli;
pub mod error;
pub mod image_utils;
pub mod network_onnx;
pub mod pipeline;
pub mod tracker_backend;
pub mod types;
pub mod video_utils;

pub use error::{Result, TrackingError};
pub use image_utils::{annotate, generate_colors, MAX_OBJECTS};
pub use network_onnx::{ExecutionBackend, OnnxSiameseNetwork};
pub use pipeline::{FrameSink, FrameSource, MultiObjectTracker, RunStats, TrackedObject, TrackerState};
pub use tracker_backend::{create_tracker, OnnxTracker};
pub use types::{Color, TrackerConfig};

#[cfg(feature = "opencv")]
pub use video_utils::{VideoFileSink, VideoFileSource};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
