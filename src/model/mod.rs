//! Classifier models and the provider chain that loads them.

mod descriptor;
mod network;
mod onnx;
mod provider;
mod tensor;

pub use descriptor::{
    Location, ModelDescriptor, download_file, fetch_descriptor, http_client, materialize_weights,
    verify_checksum,
};
pub use network::{Activation, ArchitectureSpec, CompileConfig, LayerSpec, Network};
pub use onnx::OnnxClassifier;
pub use provider::{LoadProgress, ModelProviderChain, ModelStrategy};
pub use tensor::{Tensor, TensorRegistry};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which provider tier produced a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitectureKind {
    /// Pre-trained weights fetched from a descriptor.
    RemotePretrained,
    /// Convolutional architecture constructed locally.
    CustomBuilt,
    /// Smallest architecture, always available.
    MinimalFallback,
}

impl std::fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemotePretrained => write!(f, "remote-pretrained"),
            Self::CustomBuilt => write!(f, "custom-built"),
            Self::MinimalFallback => write!(f, "minimal-fallback"),
        }
    }
}

/// Pixel value range fed to a classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `pixel / 255`.
    #[default]
    ZeroToOne,
    /// `pixel / 127.5 - 1`.
    MinusOneToOne,
}

impl Normalization {
    /// Map an 8-bit channel value into this range.
    pub fn apply(self, value: u8) -> f32 {
        let v = f32::from(value);
        match self {
            Self::ZeroToOne => v / 255.0,
            Self::MinusOneToOne => v / 127.5 - 1.0,
        }
    }
}

/// Identity of the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelHandle {
    /// Model name, reported as `model_used` on detections.
    pub name: String,
    /// Tier that produced the model.
    pub architecture_kind: ArchitectureKind,
    /// Expected accuracy in `[0, 1]`.
    pub accuracy_estimate: f32,
    /// Load time in milliseconds since the Unix epoch.
    pub loaded_at_epoch_ms: i64,
}

impl ModelHandle {
    fn new(name: impl Into<String>, kind: ArchitectureKind, accuracy: f32) -> Self {
        Self {
            name: name.into(),
            architecture_kind: kind,
            accuracy_estimate: accuracy.clamp(0.0, 1.0),
            loaded_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug)]
enum Backend {
    Onnx(OnnxClassifier),
    Native(Network),
}

/// A ready classifier plus its input contract.
#[derive(Debug)]
pub struct LoadedModel {
    handle: ModelHandle,
    input_edge: u32,
    normalization: Normalization,
    output_width: usize,
    backend: Backend,
}

impl LoadedModel {
    /// Wrap a locally constructed network.
    pub fn native(
        network: Network,
        kind: ArchitectureKind,
        accuracy: f32,
        input_edge: u32,
        normalization: Normalization,
    ) -> Self {
        Self {
            handle: ModelHandle::new(network.name(), kind, accuracy),
            input_edge,
            normalization,
            output_width: network.output_width(),
            backend: Backend::Native(network),
        }
    }

    /// Wrap an ONNX Runtime session built from a descriptor.
    pub fn onnx(
        classifier: OnnxClassifier,
        descriptor: &ModelDescriptor,
        input_edge: u32,
        accuracy: f32,
    ) -> Self {
        Self {
            handle: ModelHandle::new(
                descriptor.name.clone(),
                ArchitectureKind::RemotePretrained,
                accuracy,
            ),
            input_edge,
            normalization: descriptor.normalization,
            output_width: descriptor.num_classes,
            backend: Backend::Onnx(classifier),
        }
    }

    /// Model identity.
    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Square input edge in pixels.
    pub fn input_edge(&self) -> u32 {
        self.input_edge
    }

    /// Pixel normalization expected by the model.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Length of the probability vector the model produces.
    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Run a forward pass.
    pub fn forward(&self, input: &Tensor, registry: &TensorRegistry) -> Result<Vec<f32>> {
        match &self.backend {
            Backend::Native(network) => network.forward(input, registry),
            Backend::Onnx(session) => session.run(input),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_ranges() {
        assert!(Normalization::ZeroToOne.apply(0).abs() < f32::EPSILON);
        assert!((Normalization::ZeroToOne.apply(255) - 1.0).abs() < f32::EPSILON);
        assert!((Normalization::MinusOneToOne.apply(0) + 1.0).abs() < f32::EPSILON);
        assert!((Normalization::MinusOneToOne.apply(255) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_architecture_kind_names() {
        assert_eq!(ArchitectureKind::MinimalFallback.to_string(), "minimal-fallback");
        let kind: ArchitectureKind = serde_json::from_str("\"remote-pretrained\"").unwrap();
        assert_eq!(kind, ArchitectureKind::RemotePretrained);
    }

    #[test]
    fn test_native_model_handle() {
        let network = Network::build(&ArchitectureSpec::minimal(3), 8, 1).unwrap();
        let model = LoadedModel::native(
            network,
            ArchitectureKind::MinimalFallback,
            1.5,
            8,
            Normalization::ZeroToOne,
        );
        assert_eq!(model.handle().name, "minimal-fallback-cnn");
        assert!((model.handle().accuracy_estimate - 1.0).abs() < f32::EPSILON);
        assert_eq!(model.output_width(), 3);
        assert!(model.handle().loaded_at_epoch_ms > 0);
    }
}
