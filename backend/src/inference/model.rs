use std::sync::{Arc, Mutex};

use ndarray::Array4;
use shared::CLASS_COUNT;
use tch::{CModule, Device, Kind, Tensor};

use crate::inference::preprocess::{self, PreprocessError};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model is unavailable: {0}")]
    ModelUnavailable(String),
    #[error("image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("model execution failed: {0}")]
    Model(#[from] tch::TchError),
    #[error("model returned {got} scores, expected {expected}")]
    OutputShape { got: usize, expected: usize },
    #[error("inference timed out after {0} seconds")]
    Timeout(u64),
}

/// Handle to the pre-trained TorchScript classifier. Loading is attempted
/// once at startup; a failed load leaves the service running with an explicit
/// `Unavailable` handle instead of a poisoned null reference, and every
/// prediction against it reports the stored reason.
#[derive(Clone)]
pub enum Classifier {
    Ready(Arc<Mutex<CModule>>),
    Unavailable { reason: String },
}

impl Classifier {
    pub fn load(model_path: &str) -> Self {
        let device = Device::cuda_if_available();
        match CModule::load_on_device(model_path, device) {
            Ok(module) => {
                log::info!("loaded model from {} on {:?}", model_path, device);
                Classifier::Ready(Arc::new(Mutex::new(module)))
            }
            Err(e) => {
                log::error!("failed to load model from {}: {}", model_path, e);
                Classifier::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Classifier::Ready(_))
    }

    pub fn load_error(&self) -> Option<&str> {
        match self {
            Classifier::Ready(_) => None,
            Classifier::Unavailable { reason } => Some(reason),
        }
    }

    /// Full pipeline for one uploaded image: decode and normalize, then run
    /// the model forward pass.
    pub fn infer(&self, image_data: &[u8]) -> Result<Vec<f32>, InferenceError> {
        let tensor = preprocess::normalize(image_data)?;
        self.predict(&tensor)
    }

    /// Runs the forward pass on an already-normalized input tensor and
    /// returns the model's score vector as-is. Idempotent for a fixed input.
    pub fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let module = match self {
            Classifier::Ready(module) => module,
            Classifier::Unavailable { reason } => {
                return Err(InferenceError::ModelUnavailable(reason.clone()));
            }
        };

        let (batch, height, width, channels) = input.dim();
        let flat: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_slice(&flat).view([
            batch as i64,
            height as i64,
            width as i64,
            channels as i64,
        ]);

        let output = module.lock().unwrap().forward_ts(&[&tensor])?;
        let output_flat = output.to_kind(Kind::Float).view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut scores = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut scores, num_elements);

        if scores.len() != CLASS_COUNT {
            return Err(InferenceError::OutputShape {
                got: scores.len(),
                expected: CLASS_COUNT,
            });
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_yields_unavailable_handle() {
        let classifier = Classifier::load("/nonexistent/model.pt");
        assert!(!classifier.is_ready());
        assert!(classifier.load_error().is_some());
    }

    #[test]
    fn predict_on_unavailable_handle_is_an_error() {
        let classifier = Classifier::Unavailable {
            reason: "model file missing".to_string(),
        };
        let input = Array4::<f32>::zeros((1, 224, 224, 3));
        let err = classifier.predict(&input).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[test]
    fn infer_still_reports_preprocess_failures_first() {
        let classifier = Classifier::Unavailable {
            reason: "model file missing".to_string(),
        };
        let err = classifier.infer(b"not an image").unwrap_err();
        assert!(matches!(err, InferenceError::Preprocess(_)));
    }
}
