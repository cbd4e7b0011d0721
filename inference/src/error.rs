//! Error types for the SiamRPN video tracker

use thiserror::Error;

/// Result type alias for the video tracker
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Errors that can occur while tracking objects through a video
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Model loading failed: {0}")]
    ModelLoadError(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),

    #[error("GPU not available or initialization failed")]
    GpuUnavailable,

    #[error("Video error: {0}")]
    VideoError(String),

    #[error("Invalid initial boxes: {0}")]
    InvalidBoxes(String),

    #[error("Too many objects: {count} requested, at most {max} supported")]
    TooManyObjects { count: usize, max: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tracker failed: {0}")]
    Tracker(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl TrackingError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoadError(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::InferenceError(msg.into())
    }

    pub fn video<S: Into<String>>(msg: S) -> Self {
        Self::VideoError(msg.into())
    }

    pub fn invalid_boxes<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBoxes(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Wrap a tracker failure, keeping the whole context chain
    pub fn tracker(err: anyhow::Error) -> Self {
        Self::Tracker(format!("{err:#}"))
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for TrackingError {
    fn from(err: opencv::Error) -> Self {
        Self::VideoError(err.to_string())
    }
}
