//! Tracker construction with GPU to CPU fallback

use crate::error::{Result, TrackingError};
use crate::network_onnx::{ExecutionBackend, OnnxSiameseNetwork};
use crate::types::TrackerConfig;
use log::{info, warn};
use siamtrack::{SiamRpnTracker, Tracker};
use std::path::Path;

/// SiamRPN tracker over an ONNX Runtime network
pub type OnnxTracker = SiamRpnTracker<OnnxSiameseNetwork>;

/// Build with `primary`; on failure warn once and build with `secondary`
///
/// An error from `secondary` is returned as is.
pub fn with_fallback<T, P, S>(primary: P, secondary: S) -> Result<T>
where
    P: FnOnce() -> Result<T>,
    S: FnOnce() -> Result<T>,
{
    match primary() {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("CUDA unavailable ({}), using CPU version", e);
            secondary()
        }
    }
}

/// Build a SiamRPN tracker on one execution backend
pub fn create_tracker_on(
    model_path: &Path,
    backend: ExecutionBackend,
    config: &TrackerConfig,
) -> Result<OnnxTracker> {
    let network = OnnxSiameseNetwork::new(model_path, backend)?;
    SiamRpnTracker::new(network, config.params.clone())
        .map_err(|e| TrackingError::config(format!("{e:#}")))
}

/// Build a SiamRPN tracker, preferring the GPU when the configuration allows it
pub fn create_tracker(model_path: &Path, config: &TrackerConfig) -> Result<Box<dyn Tracker>> {
    let cpu = ExecutionBackend::Cpu {
        num_threads: config.num_threads,
    };

    let tracker = if config.use_gpu {
        let cuda = ExecutionBackend::Cuda {
            device_id: config.gpu_device_id,
        };
        with_fallback(
            || create_tracker_on(model_path, cuda, config),
            || create_tracker_on(model_path, cpu, config),
        )?
    } else {
        info!("GPU disabled, using CPU version");
        create_tracker_on(model_path, cpu, config)?
    };

    Ok(Box::new(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_primary_success_skips_secondary() {
        let calls = RefCell::new(Vec::new());
        let value = with_fallback(
            || {
                calls.borrow_mut().push("gpu");
                Ok(1)
            },
            || {
                calls.borrow_mut().push("cpu");
                Ok(2)
            },
        )
        .unwrap();

        assert_eq!(value, 1);
        assert_eq!(*calls.borrow(), vec!["gpu"]);
    }

    #[test]
    fn test_primary_failure_falls_back() {
        let calls = RefCell::new(Vec::new());
        let value = with_fallback(
            || {
                calls.borrow_mut().push("gpu");
                Err(TrackingError::GpuUnavailable)
            },
            || {
                calls.borrow_mut().push("cpu");
                Ok(2)
            },
        )
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(*calls.borrow(), vec!["gpu", "cpu"]);
    }

    #[test]
    fn test_both_failing_propagates_secondary_error() {
        let result: Result<u32> = with_fallback(
            || Err(TrackingError::GpuUnavailable),
            || Err(TrackingError::model_load("cpu session failed")),
        );
        assert!(matches!(result, Err(TrackingError::ModelLoadError(ref msg)) if msg == "cpu session failed"));
    }

    #[test]
    fn test_create_tracker_missing_model() {
        let config = TrackerConfig::default();
        let result = create_tracker(Path::new("/nonexistent/siamrpn.onnx"), &config);
        assert!(matches!(result, Err(TrackingError::ModelLoadError(_))));

        let config = TrackerConfig {
            use_gpu: false,
            ..Default::default()
        };
        let result = create_tracker(Path::new("/nonexistent/siamrpn.onnx"), &config);
        assert!(matches!(result, Err(TrackingError::ModelLoadError(_))));
    }
}
