//! Locally constructed convolutional classifiers.
//!
//! These back the custom-built and minimal fallback tiers. Layers are
//! `burn` modules on the CPU `NdArray` backend. Weights are He-uniform
//! initialised from a fixed seed, so predictions are close to uniform noise
//! but fully reproducible.

use super::ArchitectureKind;
use super::tensor::{Tensor, TensorRegistry};
use crate::constants::{CUSTOM_MIN_INPUT_EDGE, INPUT_CHANNELS, compile};
use crate::error::{Error, Result};
use burn::backend::ndarray::NdArray;
use burn::module::{Module, Param};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, PaddingConfig2d};
use burn::optim::AdamConfig;
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, TensorData};
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

type Cpu = NdArray<f32>;
type Device = <Cpu as Backend>::Device;
type BurnTensor<const D: usize> = burn::tensor::Tensor<Cpu, D>;
/// Layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Rectified linear unit.
    Relu,
    /// Normalised exponential over the whole vector.
    Softmax,
}

/// One layer of an architecture description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSpec {
    /// 3x3 "same"-padded convolution followed by ReLU.
    Conv {
        /// Output channels.
        filters: usize,
        /// Stride in both directions.
        stride: usize,
    },
    /// Non-overlapping max pooling.
    MaxPool {
        /// Window size and stride.
        size: usize,
    },
    /// Average over the spatial dimensions.
    GlobalAveragePool,
    /// Fully connected layer.
    Dense {
        /// Output width.
        units: usize,
        /// Activation applied to the output.
        activation: Activation,
    },
}

/// Training configuration attached to every constructed network.
#[derive(Clone)]
pub struct CompileConfig {
    /// Adam optimizer settings.
    pub optimizer: AdamConfig,
    /// Learning rate handed to the optimizer step.
    pub learning_rate: f64,
    /// Categorical cross-entropy over the softmax head.
    pub loss: CrossEntropyLossConfig,
}

impl CompileConfig {
    /// Optimizer name.
    pub fn optimizer_name(&self) -> &'static str {
        compile::OPTIMIZER
    }

    /// Loss name.
    pub fn loss_name(&self) -> &'static str {
        compile::LOSS
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            optimizer: AdamConfig::new().with_epsilon(compile::ADAM_EPSILON),
            learning_rate: compile::LEARNING_RATE,
            // The head already ends in softmax.
            loss: CrossEntropyLossConfig::new().with_logits(false),
        }
    }
}

impl fmt::Debug for CompileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileConfig")
            .field("optimizer", &self.optimizer_name())
            .field("learning_rate", &self.learning_rate)
            .field("loss", &self.loss_name())
            .finish()
    }
}

/// Architecture description before weights exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureSpec {
    /// Tier this architecture serves.
    pub kind: ArchitectureKind,
    /// Reported model name.
    pub name: &'static str,
    /// Smallest input edge the layer stack supports.
    pub min_input_edge: u32,
    /// Layers in order.
    pub layers: Vec<LayerSpec>,
}

impl ArchitectureSpec {
    /// Three convolution blocks, a hidden dense layer and a softmax head.
    pub fn custom(num_classes: usize) -> Self {
        Self {
            kind: ArchitectureKind::CustomBuilt,
            name: "custom-built-cnn",
            min_input_edge: CUSTOM_MIN_INPUT_EDGE,
            layers: vec![
                LayerSpec::Conv {
                    filters: 16,
                    stride: 2,
                },
                LayerSpec::Conv {
                    filters: 32,
                    stride: 2,
                },
                LayerSpec::MaxPool { size: 2 },
                LayerSpec::Conv {
                    filters: 64,
                    stride: 2,
                },
                LayerSpec::GlobalAveragePool,
                LayerSpec::Dense {
                    units: 128,
                    activation: Activation::Relu,
                },
                LayerSpec::Dense {
                    units: num_classes,
                    activation: Activation::Softmax,
                },
            ],
        }
    }

    /// Two convolution blocks and a softmax head.
    pub fn minimal(num_classes: usize) -> Self {
        Self {
            kind: ArchitectureKind::MinimalFallback,
            name: "minimal-fallback-cnn",
            min_input_edge: 1,
            layers: vec![
                LayerSpec::Conv {
                    filters: 8,
                    stride: 2,
                },
                LayerSpec::MaxPool { size: 2 },
                LayerSpec::Conv {
                    filters: 16,
                    stride: 2,
                },
                LayerSpec::GlobalAveragePool,
                LayerSpec::Dense {
                    units: num_classes,
                    activation: Activation::Softmax,
                },
            ],
        }
    }
}

const KERNEL: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Spatial { h: usize, w: usize, c: usize },
    Flat(usize),
}

#[derive(Debug)]
enum Layer {
    Conv(Conv2d<Cpu>),
    MaxPool(MaxPool2d),
    GlobalAveragePool(AdaptiveAvgPool2d),
    Dense {
        linear: Linear<Cpu>,
        activation: Activation,
    },
}

enum Activations {
    Spatial(BurnTensor<4>),
    Flat(BurnTensor<2>),
}

/// A constructed network with initialised weights.
#[derive(Debug)]
pub struct Network {
    name: &'static str,
    input_edge: usize,
    output_width: usize,
    parameters: usize,
    compile: CompileConfig,
    device: Device,
    layers: Mutex<Vec<Layer>>,
}

impl Network {
    /// Instantiate `spec` for a square input of `input_edge` pixels.
    ///
    /// Fails with a description when the configuration is unsupported.
    pub fn build(
        spec: &ArchitectureSpec,
        input_edge: u32,
        seed: u64,
    ) -> std::result::Result<Self, String> {
        if input_edge < spec.min_input_edge {
            return Err(format!(
                "input edge {input_edge} below minimum {}",
                spec.min_input_edge
            ));
        }
        let edge = input_edge as usize;
        let device = Device::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut shape = Shape::Spatial {
            h: edge,
            w: edge,
            c: INPUT_CHANNELS,
        };
        let mut layers = Vec::with_capacity(spec.layers.len());

        for layer in &spec.layers {
            let (next, built) = match (*layer, shape) {
                (LayerSpec::Conv { filters, stride }, Shape::Spatial { h, w, c }) => {
                    if filters == 0 || stride == 0 {
                        return Err("convolution needs filters and stride".to_string());
                    }
                    let mut conv = Conv2dConfig::new([c, filters], [KERNEL, KERNEL])
                        .with_stride([stride, stride])
                        .with_padding(PaddingConfig2d::Explicit(KERNEL / 2, KERNEL / 2))
                        .with_initializer(Initializer::Zeros)
                        .init::<Cpu>(&device);
                    conv.weight = Param::from_tensor(he_uniform(
                        &mut rng,
                        KERNEL * KERNEL * c,
                        [filters, c, KERNEL, KERNEL],
                        &device,
                    ));
                    let pad = KERNEL / 2;
                    (
                        Shape::Spatial {
                            h: (h + 2 * pad - KERNEL) / stride + 1,
                            w: (w + 2 * pad - KERNEL) / stride + 1,
                            c: filters,
                        },
                        Layer::Conv(conv),
                    )
                }
                (LayerSpec::MaxPool { size }, Shape::Spatial { h, w, c }) => {
                    if size == 0 {
                        return Err("pool size must be positive".to_string());
                    }
                    // A window never exceeds the feature map, so tiny inputs pool to 1x1.
                    let window = [size.min(h), size.min(w)];
                    let pool = MaxPool2dConfig::new(window).with_strides(window).init();
                    (
                        Shape::Spatial {
                            h: h / window[0],
                            w: w / window[1],
                            c,
                        },
                        Layer::MaxPool(pool),
                    )
                }
                (LayerSpec::GlobalAveragePool, Shape::Spatial { c, .. }) => (
                    Shape::Flat(c),
                    Layer::GlobalAveragePool(AdaptiveAvgPool2dConfig::new([1, 1]).init()),
                ),
                (LayerSpec::Dense { units, activation }, Shape::Flat(inputs)) => {
                    if units == 0 {
                        return Err("dense layer has zero units (empty catalog?)".to_string());
                    }
                    let mut linear = LinearConfig::new(inputs, units)
                        .with_initializer(Initializer::Zeros)
                        .init::<Cpu>(&device);
                    linear.weight =
                        Param::from_tensor(he_uniform(&mut rng, inputs, [inputs, units], &device));
                    (Shape::Flat(units), Layer::Dense { linear, activation })
                }
                (layer, shape) => {
                    return Err(format!("layer {layer:?} cannot follow shape {shape:?}"));
                }
            };
            shape = next;
            layers.push(built);
        }

        let Shape::Flat(output_width) = shape else {
            return Err("architecture does not end in a dense head".to_string());
        };
        let parameters = layers.iter().map(Layer::num_params).sum();

        Ok(Self {
            name: spec.name,
            input_edge: edge,
            output_width,
            parameters,
            compile: CompileConfig::default(),
            device,
            layers: Mutex::new(layers),
        })
    }

    /// Reported model name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Width of the output vector.
    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Number of trainable parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters
    }

    /// Compile configuration.
    pub fn compile_config(&self) -> &CompileConfig {
        &self.compile
    }

    /// Forward pass over a `[1, edge, edge, 3]` tensor.
    ///
    /// The score vector is tracked by `registry` and released before this
    /// returns.
    pub fn forward(&self, input: &Tensor, registry: &TensorRegistry) -> Result<Vec<f32>> {
        let scores = self.probabilities(input)?;
        let values = scores.into_data().to_vec::<f32>().map_err(|e| Error::Inference {
            reason: format!("unreadable network output: {e:?}"),
        })?;
        let scores = ArrayD::from_shape_vec(IxDyn(&[values.len()]), values).map_err(|e| {
            Error::Inference {
                reason: format!("network output shape: {e}"),
            }
        })?;
        let tracked = registry.track(scores);
        Ok(tracked.data().iter().copied().collect())
    }

    /// Categorical cross-entropy of the prediction for `input` against class
    /// `target`, using the compiled loss.
    pub fn loss(&self, input: &Tensor, target: usize) -> Result<f32> {
        if target >= self.output_width {
            return Err(Error::Inference {
                reason: format!("target class {target} outside {} outputs", self.output_width),
            });
        }
        let scores = self.probabilities(input)?;
        let targets = burn::tensor::Tensor::<Cpu, 1, Int>::from_data(
            TensorData::new(vec![target as i64], [1]),
            &self.device,
        );
        let loss = self
            .compile
            .loss
            .init::<Cpu>(&self.device)
            .forward(scores, targets);
        Ok(loss.into_scalar())
    }

    fn probabilities(&self, input: &Tensor) -> Result<BurnTensor<2>> {
        let expected = [1, self.input_edge, self.input_edge, INPUT_CHANNELS];
        if input.shape() != expected {
            return Err(Error::Inference {
                reason: format!(
                    "input shape {:?} does not match expected {expected:?}",
                    input.shape()
                ),
            });
        }

        let values: Vec<f32> = input.data().iter().copied().collect();
        // NHWC frame tensor to the NCHW layout burn convolutions expect.
        let x = BurnTensor::<4>::from_data(TensorData::new(values, expected), &self.device)
            .permute([0, 3, 1, 2]);

        let layers = self.layers.lock().map_err(|_| Error::Internal {
            message: "network lock poisoned".to_string(),
        })?;
        let mut current = Activations::Spatial(x);
        for layer in layers.iter() {
            current = layer.apply(current)?;
        }
        match current {
            Activations::Flat(scores) => Ok(scores),
            Activations::Spatial(_) => Err(Error::Inference {
                reason: "network ended on a feature map".to_string(),
            }),
        }
    }
}

impl Layer {
    fn num_params(&self) -> usize {
        match self {
            Self::Conv(conv) => conv.num_params(),
            Self::Dense { linear, .. } => linear.num_params(),
            Self::MaxPool(_) | Self::GlobalAveragePool(_) => 0,
        }
    }

    fn apply(&self, input: Activations) -> Result<Activations> {
        Ok(match (self, input) {
            (Self::Conv(conv), Activations::Spatial(x)) => {
                Activations::Spatial(relu(conv.forward(x)))
            }
            (Self::MaxPool(pool), Activations::Spatial(x)) => {
                Activations::Spatial(pool.forward(x))
            }
            (Self::GlobalAveragePool(pool), Activations::Spatial(x)) => {
                Activations::Flat(pool.forward(x).flatten::<2>(1, 3))
            }
            (Self::Dense { linear, activation }, Activations::Flat(x)) => {
                let out = linear.forward(x);
                Activations::Flat(match activation {
                    Activation::Relu => relu(out),
                    Activation::Softmax => softmax(out, 1),
                })
            }
            _ => {
                return Err(Error::Inference {
                    reason: "layer received activations of the wrong rank".to_string(),
                });
            }
        })
    }
}

fn he_uniform<const D: usize>(
    rng: &mut StdRng,
    fan_in: usize,
    shape: [usize; D],
    device: &Device,
) -> BurnTensor<D> {
    let limit = (6.0 / fan_in.max(1) as f32).sqrt();
    let len: usize = shape.iter().product();
    let values: Vec<f32> = (0..len).map(|_| rng.random_range(-limit..limit)).collect();
    BurnTensor::<D>::from_data(TensorData::new(values, shape), device)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(registry: &TensorRegistry, edge: usize, value: f32) -> Tensor {
        registry.track(ArrayD::from_elem(IxDyn(&[1, edge, edge, 3]), value))
    }

    #[test]
    fn test_custom_rejects_small_edge() {
        let err = Network::build(&ArchitectureSpec::custom(10), 16, 42).unwrap_err();
        assert!(err.contains("below minimum 32"));
    }

    #[test]
    fn test_empty_catalog_is_unsupported() {
        assert!(Network::build(&ArchitectureSpec::custom(0), 64, 42).is_err());
        assert!(Network::build(&ArchitectureSpec::minimal(0), 64, 42).is_err());
    }

    #[test]
    fn test_minimal_accepts_tiny_edges() {
        let network = Network::build(&ArchitectureSpec::minimal(3), 2, 42).unwrap();
        let registry = TensorRegistry::new();
        let x = input(&registry, 2, 0.5);
        let out = network.forward(&x, &registry).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_forward_is_a_distribution() {
        let network = Network::build(&ArchitectureSpec::custom(7), 32, 42).unwrap();
        assert_eq!(network.output_width(), 7);
        let registry = TensorRegistry::new();
        let x = input(&registry, 32, 0.25);
        let out = network.forward(&x, &registry).unwrap();
        assert_eq!(out.len(), 7);
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(out.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_same_seed_same_output() {
        let spec = ArchitectureSpec::minimal(5);
        let a = Network::build(&spec, 16, 7).unwrap();
        let b = Network::build(&spec, 16, 7).unwrap();
        let registry = TensorRegistry::new();
        let x = input(&registry, 16, 0.8);
        assert_eq!(
            a.forward(&x, &registry).unwrap(),
            b.forward(&x, &registry).unwrap()
        );
    }

    #[test]
    fn test_intermediates_are_released() {
        let network = Network::build(&ArchitectureSpec::custom(4), 32, 42).unwrap();
        let registry = TensorRegistry::new();
        let x = input(&registry, 32, 0.1);
        let baseline = registry.live();
        network.forward(&x, &registry).unwrap();
        assert_eq!(registry.live(), baseline);
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let network = Network::build(&ArchitectureSpec::minimal(4), 16, 42).unwrap();
        let registry = TensorRegistry::new();
        let x = input(&registry, 8, 0.1);
        let result = network.forward(&x, &registry);
        assert!(matches!(result, Err(Error::Inference { .. })));
        drop(x);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_compile_config_is_fixed() {
        let network = Network::build(&ArchitectureSpec::minimal(2), 8, 1).unwrap();
        let compile = network.compile_config();
        assert_eq!(compile.optimizer_name(), "adam");
        assert_eq!(compile.loss_name(), "categorical_crossentropy");
        assert!((compile.learning_rate - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parameter_count_matches_layers() {
        // conv 3->8 (216 + 8), conv 8->16 (1152 + 16), dense 16->4 (64 + 4)
        let network = Network::build(&ArchitectureSpec::minimal(4), 16, 1).unwrap();
        assert_eq!(network.parameter_count(), 224 + 1168 + 68);
    }

    #[test]
    fn test_loss_is_cross_entropy_of_prediction() {
        let network = Network::build(&ArchitectureSpec::minimal(3), 16, 5).unwrap();
        let registry = TensorRegistry::new();
        let x = input(&registry, 16, 0.3);
        let probs = network.forward(&x, &registry).unwrap();
        let loss = network.loss(&x, 1).unwrap();
        assert!((loss + probs[1].ln()).abs() < 1e-4);
        assert!(matches!(network.loss(&x, 3), Err(Error::Inference { .. })));
    }
}
