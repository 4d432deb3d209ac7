//! ONNX Runtime backend for remote pre-trained weights.

use super::tensor::Tensor;
use crate::error::{Error, Result};
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier").finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Build a session from an `.onnx` file.
    ///
    /// Loads the ONNX Runtime library on first use, so call this off the
    /// async executor.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ort::Error> {
        let session = SessionBuilder::new()?
            .with_intra_threads(1)?
            .commit_from_file(path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Run one forward pass and return the first output flattened.
    pub fn run(&self, input: &Tensor) -> Result<Vec<f32>> {
        let data = input.as_slice().ok_or_else(|| Error::Inference {
            reason: "input tensor is not contiguous".to_string(),
        })?;
        let value =
            TensorRef::from_array_view((input.shape().to_vec(), data)).map_err(|e| {
                Error::Inference {
                    reason: format!("failed to wrap input tensor: {e}"),
                }
            })?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "session lock poisoned".to_string(),
        })?;
        let outputs = session
            .run(ort::inputs![value])
            .map_err(|e| Error::Inference {
                reason: format!("session run failed: {e}"),
            })?;
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("unexpected output tensor: {e}"),
            })?;
        Ok(scores.to_vec())
    }
}
