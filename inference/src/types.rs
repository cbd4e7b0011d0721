//! Type definitions for the video tracker

use crate::error::{Result, TrackingError};
use image::Rgb;
use serde::{Deserialize, Serialize};
use siamtrack::SiamRpnParams;
use std::path::Path;

/// Box colour stored in OpenCV channel order `(B, G, R)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Convert to an RGB pixel for drawing on an `RgbImage`
    pub fn to_rgb(self) -> Rgb<u8> {
        let [b, g, r] = self.0;
        Rgb([r, g, b])
    }
}

/// Configuration for the SiamRPN trackers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Use GPU acceleration if available
    pub use_gpu: bool,

    /// GPU device ID (for multi-GPU systems)
    pub gpu_device_id: i32,

    /// Number of threads for CPU inference
    pub num_threads: Option<usize>,

    /// Tracker hyper-parameters
    pub params: SiamRpnParams,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            use_gpu: true,
            gpu_device_id: 0,
            num_threads: None,
            params: SiamRpnParams::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrackingError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.params.validate().map_err(|e| {
            TrackingError::config(format!("Invalid tracker parameters in {}: {e:#}", path.display()))
        })?;
        Ok(config)
    }
}
