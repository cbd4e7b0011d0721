//! ONNX Runtime backend for the Siamese network forward pass
//!
//! The model takes two inputs, `template` `[1, 3, 127, 127]` and `search`
//! `[1, 3, 271, 271]` (BGR, raw 0-255 values), and produces `cls`
//! `[1, 2K, S, S]` followed by `loc` `[1, 4K, S, S]`.

use crate::error::TrackingError;
use log::{debug, info};
use ndarray::{Array4, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use siamtrack::{NetworkOutput, SiameseNetwork};
use std::fmt;
use std::path::Path;

/// Execution provider a session is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionBackend {
    Cuda { device_id: i32 },
    Cpu { num_threads: Option<usize> },
}

impl fmt::Display for ExecutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda { device_id } => write!(f, "CUDA (device {})", device_id),
            Self::Cpu { .. } => write!(f, "CPU"),
        }
    }
}

/// Siamese network backed by an ONNX Runtime session
pub struct OnnxSiameseNetwork {
    session: Session,
    backend: ExecutionBackend,
}

impl OnnxSiameseNetwork {
    /// Load `model_path` on the given backend
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        backend: ExecutionBackend,
    ) -> Result<Self, TrackingError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(TrackingError::model_load(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = match backend {
            ExecutionBackend::Cuda { device_id } => {
                Self::create_cuda_session(model_path, device_id)?
            }
            ExecutionBackend::Cpu { num_threads } => {
                Self::create_cpu_session(model_path, num_threads)?
            }
        };

        if session.inputs.len() != 2 || session.outputs.len() != 2 {
            return Err(TrackingError::model_load(format!(
                "Expected a model with 2 inputs and 2 outputs, got {} inputs and {} outputs",
                session.inputs.len(),
                session.outputs.len()
            )));
        }

        info!(
            "✓ SiamRPN model {} loaded with {}",
            model_path.display(),
            backend
        );
        Ok(Self { session, backend })
    }

    pub fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    /// Try to create a GPU-accelerated session with CUDA
    #[cfg(feature = "cuda")]
    fn create_cuda_session(model_path: &Path, device_id: i32) -> Result<Session, TrackingError> {
        use ort::execution_providers::CUDAExecutionProvider;

        info!("Attempting to use CUDA backend (NVIDIA GPU)...");

        let session = Session::builder()
            .map_err(|e| TrackingError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| TrackingError::model_load(e.to_string()))?
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build()
                .error_on_failure()])
            .map_err(|e| TrackingError::model_load(format!("CUDA provider failed: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| {
                TrackingError::model_load(format!("Failed to load model with CUDA: {}", e))
            })?;

        Ok(session)
    }

    #[cfg(not(feature = "cuda"))]
    fn create_cuda_session(_model_path: &Path, _device_id: i32) -> Result<Session, TrackingError> {
        Err(TrackingError::GpuUnavailable)
    }

    /// Create a CPU-only session
    fn create_cpu_session(
        model_path: &Path,
        num_threads: Option<usize>,
    ) -> Result<Session, TrackingError> {
        let mut builder = Session::builder()
            .map_err(|e| TrackingError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| TrackingError::model_load(e.to_string()))?;

        if let Some(threads) = num_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| TrackingError::model_load(e.to_string()))?;
        }

        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| TrackingError::model_load(format!("Failed to load model: {}", e)))?;

        Ok(session)
    }

    fn run(
        &mut self,
        template: &Array4<f32>,
        search: &Array4<f32>,
    ) -> Result<NetworkOutput, TrackingError> {
        let template_ref = TensorRef::from_array_view(template)
            .map_err(|e| TrackingError::inference(e.to_string()))?;
        let search_ref = TensorRef::from_array_view(search)
            .map_err(|e| TrackingError::inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![template_ref, search_ref])
            .map_err(|e| TrackingError::inference(e.to_string()))?;

        let cls = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| TrackingError::inference(format!("cls output: {}", e)))?
            .into_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|e| TrackingError::inference(format!("cls output is not 4-D: {}", e)))?;

        let loc = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| TrackingError::inference(format!("loc output: {}", e)))?
            .into_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|e| TrackingError::inference(format!("loc output is not 4-D: {}", e)))?;

        debug!("cls {:?}, loc {:?}", cls.shape(), loc.shape());
        Ok(NetworkOutput { cls, loc })
    }
}

impl SiameseNetwork for OnnxSiameseNetwork {
    fn forward(
        &mut self,
        template: &Array4<f32>,
        search: &Array4<f32>,
    ) -> anyhow::Result<NetworkOutput> {
        Ok(self.run(template, search)?)
    }
}
