use std::path::{Path, PathBuf};
use std::sync::Arc;

use tch::{CModule, Device, Kind, Tensor};

use super::MODEL_INPUT_SIZE;

#[derive(Debug, thiserror::Error)]
#[error("failed to load model from {}: {source}", .path.display())]
pub struct ModelLoadError {
    pub path: PathBuf,
    #[source]
    pub source: tch::TchError,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("forward pass failed: {0}")]
    Forward(#[from] tch::TchError),
    #[error("model produced an empty output tensor")]
    EmptyOutput,
}

/// The loaded TorchScript module. Loaded once at startup and held for the
/// process lifetime; `predict` is read-only, so concurrent requests share the
/// handle without any added locking.
#[derive(Clone)]
pub struct Classifier {
    module: Arc<CModule>,
    device: Device,
}

impl Classifier {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(path, device).map_err(|source| ModelLoadError {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            module: Arc::new(module),
            device,
        })
    }

    /// Run one forward pass and return the single sigmoid output, the
    /// probability of the `Dog` class.
    pub fn predict(&self, input: &Tensor) -> Result<f32, InferenceError> {
        let input = input.to_device(self.device);
        let output = tch::no_grad(|| self.module.forward_ts(&[input]))?;
        let flat = output.to_kind(Kind::Float).view([-1]);

        if flat.size()[0] < 1 {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(flat.double_value(&[0]) as f32)
    }

    pub fn input_size(&self) -> (u32, u32) {
        MODEL_INPUT_SIZE
    }
}
