//! The detector facade.

use super::context::PipelineContext;
use crate::catalog::{SpeciesCatalog, load_catalog_or_default};
use crate::config::{
    Config, validate_calibration, validate_history_capacity, validate_sampler, validate_thresholds,
};
use crate::detection::{ConfidenceThresholds, Detection};
use crate::error::{Error, Result};
use crate::inference::Frame;
use crate::model::{LoadProgress, ModelHandle, ModelProviderChain, TensorRegistry};
use crate::sampling::{CalibrationParams, ConfidenceCalibrator, DiversitySampler, SamplerParams};
use crate::session::{DetectionStats, SessionTracker};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Settings a [`Detector`] needs beyond the model chain.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Catalog file; the built-in catalog is used when unset or unusable.
    pub catalog_path: Option<PathBuf>,
    /// Sampler tunables.
    pub sampler: SamplerParams,
    /// Calibrator tunables.
    pub calibration: CalibrationParams,
    /// Session history capacity.
    pub history_capacity: usize,
    /// RNG seed; entropy is used when unset.
    pub rng_seed: Option<u64>,
    /// Confidence level thresholds.
    pub thresholds: ConfidenceThresholds,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DetectorOptions {
    /// Derive options from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            catalog_path: config.catalog.path.clone(),
            sampler: config.sampler,
            calibration: config.calibration,
            history_capacity: config.session.history_capacity,
            rng_seed: config.session.rng_seed,
            thresholds: config.thresholds,
        }
    }

    /// Check every tunable with the same rules as the configuration file.
    pub fn validate(&self) -> Result<()> {
        validate_sampler(&self.sampler)?;
        validate_calibration(&self.calibration)?;
        validate_history_capacity(self.history_capacity)?;
        validate_thresholds(&self.thresholds)
    }
}

/// Turns frames into detections for one monitoring session.
///
/// Call [`Detector::initialize`] once before analyzing. Several detectors
/// may share one [`ModelProviderChain`] so the model is loaded only once.
#[derive(Debug)]
pub struct Detector {
    options: DetectorOptions,
    chain: Arc<ModelProviderChain>,
    registry: TensorRegistry,
    context: Option<PipelineContext>,
    catalog_error: Option<Error>,
}

impl Detector {
    /// Create an uninitialized detector.
    pub fn new(options: DetectorOptions, chain: Arc<ModelProviderChain>) -> Self {
        Self {
            options,
            chain,
            registry: TensorRegistry::new(),
            context: None,
            catalog_error: None,
        }
    }

    /// Create a detector from configuration with its own model chain.
    pub fn from_config(config: &Config) -> Self {
        let chain = ModelProviderChain::new(
            config.model.provider_strategies(),
            config.model.input_edge,
            config.model.weight_seed,
        );
        Self::new(DetectorOptions::from_config(config), Arc::new(chain))
    }

    /// Load the catalog and acquire a model.
    ///
    /// Out-of-range options are rejected before anything loads. A missing
    /// or malformed catalog falls back to the built-in one. Beyond that,
    /// only failure of every model tier is an error. Calling this again
    /// after success does nothing.
    pub async fn initialize(&mut self, progress: Option<&dyn Fn(LoadProgress)>) -> Result<()> {
        if self.context.is_some() {
            return Ok(());
        }
        self.options.validate()?;
        let report = |status: String, percentage: u8| {
            if let Some(callback) = progress {
                callback(LoadProgress::new(status, percentage));
            }
        };

        report("Loading species catalog".to_string(), 0);
        let (catalog, catalog_error) = load_catalog_or_default(self.options.catalog_path.as_deref());
        self.catalog_error = catalog_error;
        report(
            format!("Loaded {} species from {}", catalog.len(), catalog.source()),
            10,
        );

        let model = self.chain.acquire(catalog.len(), progress).await?;
        if model.output_width() != catalog.len() {
            warn!(
                "Model {} scores {} classes but the catalog has {} species; \
                 detections will use synthetic predictions",
                model.handle().name,
                model.output_width(),
                catalog.len()
            );
        }
        let thresholds = catalog.thresholds().unwrap_or(self.options.thresholds);
        info!(
            "Detector ready: {} species, model {} ({})",
            catalog.len(),
            model.handle().name,
            model.handle().architecture_kind
        );

        let rng = self
            .options
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        self.context = Some(PipelineContext::new(
            Arc::new(catalog),
            Some(model),
            SessionTracker::new(self.options.history_capacity),
            rng,
            self.registry.clone(),
            DiversitySampler::new(self.options.sampler),
            ConfidenceCalibrator::new(self.options.calibration),
            thresholds,
        ));
        report("Ready".to_string(), 100);
        Ok(())
    }

    /// Whether [`Detector::initialize`] has completed.
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Analyze one frame.
    pub fn analyze(&mut self, frame: &Frame) -> Result<Detection> {
        self.context
            .as_mut()
            .ok_or(Error::NotInitialized)?
            .analyze_frame(frame)
    }

    /// Statistics of the current session; zeros before initialization.
    pub fn stats(&self) -> DetectionStats {
        self.context
            .as_ref()
            .map(|c| c.session().stats())
            .unwrap_or_default()
    }

    /// Clear bias and history.
    pub fn reset_session(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.session_mut().reset();
        }
    }

    /// Clear the bias so the next detection may report a new species.
    pub fn force_diversity(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.session_mut().force_diversity();
        }
    }

    /// Tensors currently alive.
    pub fn live_tensors(&self) -> usize {
        self.registry.live()
    }

    /// Catalog in use, once initialized.
    pub fn catalog(&self) -> Option<&SpeciesCatalog> {
        self.context.as_ref().map(PipelineContext::catalog)
    }

    /// Why the configured catalog was not used, if it was not.
    pub fn catalog_error(&self) -> Option<&Error> {
        self.catalog_error.as_ref()
    }

    /// Identity of the loaded model, once initialized.
    pub fn model(&self) -> Option<&ModelHandle> {
        self.context
            .as_ref()
            .and_then(PipelineContext::model)
            .map(|m| m.handle())
    }

    /// Session state, once initialized.
    pub fn session(&self) -> Option<&SessionTracker> {
        self.context.as_ref().map(PipelineContext::session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ArchitectureKind, ModelStrategy};
    use image::DynamicImage;
    use std::sync::Mutex;

    fn minimal_detector(seed: u64) -> Detector {
        let chain = ModelProviderChain::new(vec![ModelStrategy::MinimalFallback], 16, 42);
        let options = DetectorOptions {
            history_capacity: 20,
            rng_seed: Some(seed),
            ..DetectorOptions::default()
        };
        Detector::new(options, Arc::new(chain))
    }

    #[tokio::test]
    async fn test_analyze_before_initialize() {
        let mut detector = minimal_detector(1);
        let frame = Frame::from(DynamicImage::new_rgb8(8, 8));
        assert!(matches!(
            detector.analyze(&frame),
            Err(Error::NotInitialized)
        ));
        assert_eq!(detector.stats(), DetectionStats::default());
    }

    #[tokio::test]
    async fn test_initialize_reports_progress_to_completion() {
        let reports = Mutex::new(Vec::new());
        let callback = |p: LoadProgress| reports.lock().unwrap().push(p);
        let mut detector = minimal_detector(1);
        detector.initialize(Some(&callback)).await.unwrap();

        let reports = reports.into_inner().unwrap();
        assert_eq!(reports.first().unwrap().percentage, 0);
        assert_eq!(reports.last().unwrap().percentage, 100);
        assert!(detector.is_initialized());
        assert_eq!(
            detector.model().unwrap().architecture_kind,
            ArchitectureKind::MinimalFallback
        );
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let mut detector = minimal_detector(1);
        detector.initialize(None).await.unwrap();
        let loaded_at = detector.model().unwrap().loaded_at_epoch_ms;
        detector.initialize(None).await.unwrap();
        assert_eq!(detector.model().unwrap().loaded_at_epoch_ms, loaded_at);
    }

    #[tokio::test]
    async fn test_shared_chain_loads_once() {
        let chain = Arc::new(ModelProviderChain::new(
            vec![ModelStrategy::MinimalFallback],
            16,
            42,
        ));
        let mut a = Detector::new(DetectorOptions::default(), Arc::clone(&chain));
        let mut b = Detector::new(DetectorOptions::default(), Arc::clone(&chain));
        a.initialize(None).await.unwrap();
        b.initialize(None).await.unwrap();
        assert_eq!(a.model().unwrap(), b.model().unwrap());
    }

    #[tokio::test]
    async fn test_invalid_options_fail_initialize() {
        let chain = Arc::new(ModelProviderChain::new(
            vec![ModelStrategy::MinimalFallback],
            16,
            42,
        ));
        let mut options = DetectorOptions::default();
        options.sampler.exploit_probability = 1.5;
        let mut detector = Detector::new(options, Arc::clone(&chain));
        assert!(matches!(
            detector.initialize(None).await,
            Err(Error::ConfigValidation { .. })
        ));
        assert!(!detector.is_initialized());

        let mut options = DetectorOptions::default();
        options.calibration.bias_probability = -0.2;
        let mut detector = Detector::new(options, Arc::clone(&chain));
        assert!(detector.initialize(None).await.is_err());

        let options = DetectorOptions {
            history_capacity: 0,
            ..DetectorOptions::default()
        };
        let mut detector = Detector::new(options, chain);
        assert!(detector.initialize(None).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_and_diversity() {
        let mut detector = minimal_detector(3);
        detector.initialize(None).await.unwrap();
        let frame = Frame::from(DynamicImage::new_rgb8(20, 20));
        for _ in 0..12 {
            detector.analyze(&frame).unwrap();
        }
        assert_eq!(detector.stats().total_detections, 12);

        detector.force_diversity();
        assert_eq!(detector.stats().total_detections, 5);
        assert!(detector.session().unwrap().biased_species().is_none());

        detector.reset_session();
        assert_eq!(detector.stats(), DetectionStats::default());
    }
}
