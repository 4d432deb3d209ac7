//! Ordered model provider chain.
//!
//! Each strategy is tried in turn until one produces a model. The first
//! success is cached; later callers get the same model, and callers that
//! arrive during a load wait for it instead of starting another.

use super::descriptor::{Location, fetch_descriptor, http_client, materialize_weights};
use super::network::{ArchitectureSpec, Network};
use super::onnx::OnnxClassifier;
use super::{ArchitectureKind, LoadedModel, Normalization};
use crate::config::models_cache_dir;
use crate::constants::accuracy;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Progress report emitted while initializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    /// Human-readable stage description.
    pub status: String,
    /// Completion in percent, `0..=100`.
    pub percentage: u8,
}

impl LoadProgress {
    /// Build a progress report.
    pub fn new(status: impl Into<String>, percentage: u8) -> Self {
        Self {
            status: status.into(),
            percentage: percentage.min(100),
        }
    }
}

/// One way of obtaining a classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStrategy {
    /// Pre-trained ONNX weights described by a JSON descriptor.
    RemotePretrained {
        /// Descriptor path or URL. Without one this tier is skipped.
        descriptor: Option<String>,
        /// Where downloaded weights are kept.
        cache_dir: Option<PathBuf>,
    },
    /// Locally constructed convolutional network.
    CustomBuilt,
    /// Minimal network that only fails on an empty catalog.
    MinimalFallback,
}

impl ModelStrategy {
    /// Tier this strategy produces.
    pub fn kind(&self) -> ArchitectureKind {
        match self {
            Self::RemotePretrained { .. } => ArchitectureKind::RemotePretrained,
            Self::CustomBuilt => ArchitectureKind::CustomBuilt,
            Self::MinimalFallback => ArchitectureKind::MinimalFallback,
        }
    }

    async fn attempt(&self, num_classes: usize, input_edge: u32, seed: u64) -> Result<LoadedModel> {
        let tier = self.kind();
        let load_err = |reason: String| Error::ModelLoad { tier, reason };

        match self {
            Self::RemotePretrained {
                descriptor,
                cache_dir,
            } => {
                let Some(descriptor) = descriptor else {
                    return Err(load_err("no model descriptor configured".to_string()));
                };
                load_remote(descriptor, cache_dir.as_ref(), num_classes)
                    .await
                    .map_err(|e| load_err(error_chain(&e)))
            }
            Self::CustomBuilt => {
                let network = Network::build(&ArchitectureSpec::custom(num_classes), input_edge, seed)
                    .map_err(load_err)?;
                debug!(
                    "Built {} with {} parameters",
                    network.name(),
                    network.parameter_count()
                );
                Ok(LoadedModel::native(
                    network,
                    tier,
                    accuracy::CUSTOM_BUILT,
                    input_edge,
                    Normalization::MinusOneToOne,
                ))
            }
            Self::MinimalFallback => {
                let network =
                    Network::build(&ArchitectureSpec::minimal(num_classes), input_edge, seed)
                        .map_err(load_err)?;
                Ok(LoadedModel::native(
                    network,
                    tier,
                    accuracy::MINIMAL_FALLBACK,
                    input_edge,
                    Normalization::ZeroToOne,
                ))
            }
        }
    }
}

async fn load_remote(
    descriptor: &str,
    cache_dir: Option<&PathBuf>,
    num_classes: usize,
) -> Result<LoadedModel> {
    let client = http_client()?;
    let location = Location::parse(descriptor)?;
    let descriptor = fetch_descriptor(&client, &location).await?;

    let input_edge = descriptor
        .input_edge()
        .map_err(|reason| Error::Internal { message: reason })?;
    if descriptor.num_classes != num_classes {
        return Err(Error::Internal {
            message: format!(
                "descriptor has {} classes but the catalog has {num_classes}",
                descriptor.num_classes
            ),
        });
    }

    let weights = location.join(&descriptor.weights)?;
    let cache_dir = match cache_dir {
        Some(dir) => dir.clone(),
        None => models_cache_dir()?,
    };
    let path = materialize_weights(&client, &weights, &cache_dir, descriptor.sha256.as_deref())
        .await?;

    // Building the session loads the runtime library; keep it off the executor.
    let classifier = tokio::task::spawn_blocking(move || OnnxClassifier::from_file(&path))
        .await
        .map_err(|e| Error::Internal {
            message: format!("ONNX Runtime unavailable: {e}"),
        })?
        .map_err(|e| Error::Internal {
            message: format!("failed to create ONNX session: {e}"),
        })?;

    let accuracy = descriptor.accuracy.unwrap_or(accuracy::REMOTE_PRETRAINED);
    Ok(LoadedModel::onnx(classifier, &descriptor, input_edge, accuracy))
}

/// Render an error with its source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Ordered strategies plus the cached result of the first success.
#[derive(Debug)]
pub struct ModelProviderChain {
    strategies: Vec<ModelStrategy>,
    input_edge: u32,
    weight_seed: u64,
    model: OnceCell<Arc<LoadedModel>>,
}

impl ModelProviderChain {
    /// Create a chain that tries `strategies` in order.
    pub fn new(strategies: Vec<ModelStrategy>, input_edge: u32, weight_seed: u64) -> Self {
        Self {
            strategies,
            input_edge,
            weight_seed,
            model: OnceCell::new(),
        }
    }

    /// Configured strategies.
    pub fn strategies(&self) -> &[ModelStrategy] {
        &self.strategies
    }

    /// The cached model, if loading has finished.
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.model.get().cloned()
    }

    /// Return the cached model or load one with an output per class.
    ///
    /// `progress` receives one report per tier attempted.
    pub async fn acquire(
        &self,
        num_classes: usize,
        progress: Option<&dyn Fn(LoadProgress)>,
    ) -> Result<Arc<LoadedModel>> {
        self.model
            .get_or_try_init(|| self.load_first(num_classes, progress))
            .await
            .map(Arc::clone)
    }

    async fn load_first(
        &self,
        num_classes: usize,
        progress: Option<&dyn Fn(LoadProgress)>,
    ) -> Result<Arc<LoadedModel>> {
        let total = self.strategies.len().max(1);
        let mut failures = Vec::new();

        for (i, strategy) in self.strategies.iter().enumerate() {
            let kind = strategy.kind();
            if let Some(report) = progress {
                let percentage = 20 + 70 * i / total;
                report(LoadProgress::new(
                    format!("Loading {kind} model"),
                    u8::try_from(percentage).unwrap_or(90),
                ));
            }

            match strategy
                .attempt(num_classes, self.input_edge, self.weight_seed)
                .await
            {
                Ok(model) => {
                    info!(
                        "Loaded {} ({kind}, accuracy estimate {:.2})",
                        model.handle().name,
                        model.handle().accuracy_estimate
                    );
                    return Ok(Arc::new(model));
                }
                Err(e) => {
                    warn!("{e}");
                    failures.push(e.to_string());
                }
            }
        }

        let reason = if failures.is_empty() {
            "no model strategies configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(Error::Initialization { reason })
    }
}
