//! Per-session analysis state and the single-frame pipeline.

use crate::catalog::{SpeciesCatalog, SpeciesDescriptor};
use crate::constants::DEFAULT_INPUT_EDGE;
use crate::detection::{ConfidenceLevel, ConfidenceThresholds, Detection};
use crate::error::{Error, Result};
use crate::inference::{Frame, RawPrediction, predict, preprocess};
use crate::model::{LoadedModel, Normalization, TensorRegistry};
use crate::sampling::{ConfidenceCalibrator, DiversitySampler};
use crate::session::SessionTracker;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Model name reported for synthetic predictions.
const SYNTHETIC_MODEL: &str = "synthetic";

/// `model_used` for a prediction the model could not serve.
fn synthetic_model_name(model: Option<&LoadedModel>) -> String {
    model.map_or_else(
        || SYNTHETIC_MODEL.to_string(),
        |m| format!("{}+{SYNTHETIC_MODEL}", m.handle().name),
    )
}

/// Everything one session needs to turn frames into detections.
#[derive(Debug)]
pub struct PipelineContext {
    catalog: Arc<SpeciesCatalog>,
    model: Option<Arc<LoadedModel>>,
    session: SessionTracker,
    rng: StdRng,
    registry: TensorRegistry,
    sampler: DiversitySampler,
    calibrator: ConfidenceCalibrator,
    thresholds: ConfidenceThresholds,
}

impl PipelineContext {
    /// Assemble a context.
    ///
    /// Without a model every frame falls back to a synthetic prediction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<SpeciesCatalog>,
        model: Option<Arc<LoadedModel>>,
        session: SessionTracker,
        rng: StdRng,
        registry: TensorRegistry,
        sampler: DiversitySampler,
        calibrator: ConfidenceCalibrator,
        thresholds: ConfidenceThresholds,
    ) -> Self {
        Self {
            catalog,
            model,
            session,
            rng,
            registry,
            sampler,
            calibrator,
            thresholds,
        }
    }

    /// Species catalog in use.
    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    /// Loaded model, if any.
    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        self.model.as_ref()
    }

    /// Session state.
    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// Mutable session state.
    pub fn session_mut(&mut self) -> &mut SessionTracker {
        &mut self.session
    }

    /// Tensor registry shared with the model.
    pub fn registry(&self) -> &TensorRegistry {
        &self.registry
    }

    /// Run one frame through the pipeline and record the result.
    ///
    /// Preprocessing and decode failures are returned so the caller can
    /// skip the frame. Inference failures fall back to a synthetic
    /// prediction.
    pub fn analyze_frame(&mut self, frame: &Frame) -> Result<Detection> {
        let started = Instant::now();
        let num_classes = self.catalog.len();
        let model = self.model.as_deref();

        let (edge, normalization) = model.map_or(
            (DEFAULT_INPUT_EDGE, Normalization::ZeroToOne),
            |m| (m.input_edge(), m.normalization()),
        );
        let tensor = preprocess(frame, edge, normalization, &self.registry)?;

        let (raw, model_used) = match predict(tensor, model, &self.registry, num_classes) {
            Ok(raw) => (
                raw,
                model.map_or_else(|| SYNTHETIC_MODEL.to_string(), |m| m.handle().name.clone()),
            ),
            Err(e) => {
                warn!("{e}; using synthetic prediction");
                (
                    RawPrediction::synthetic(num_classes, &mut self.rng),
                    synthetic_model_name(model),
                )
            }
        };

        let sample = self
            .sampler
            .sample(&raw, &mut self.rng)
            .ok_or_else(|| Error::Internal {
                message: "species catalog is empty".to_string(),
            })?;
        let calibrated =
            self.calibrator
                .calibrate(sample.probability, sample.index, &self.session, &mut self.rng);

        let raw_confidence = if calibrated.index == sample.index {
            sample.probability
        } else {
            raw.probability(calibrated.index)
        };
        let species = self.catalog.get(calibrated.index).map_or_else(
            || Arc::new(SpeciesDescriptor::placeholder(calibrated.index)),
            Arc::clone,
        );

        let detection = Detection {
            species_index: calibrated.index,
            species,
            raw_confidence,
            calibrated_confidence: calibrated.confidence,
            confidence_level: ConfidenceLevel::classify(calibrated.confidence, &self.thresholds),
            model_used,
            processing_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            timestamp: chrono::Utc::now(),
        };

        debug!(
            "Detected {} (index {}, raw {:.4}, calibrated {:.2}, explored {}, kept bias {})",
            detection.species.name,
            detection.species_index,
            detection.raw_confidence,
            detection.calibrated_confidence,
            sample.explored,
            calibrated.kept_bias
        );

        self.session.record(detection.clone());
        Ok(detection)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use image::DynamicImage;
    use rand::SeedableRng;

    fn context_without_model() -> PipelineContext {
        PipelineContext::new(
            Arc::new(default_catalog()),
            None,
            SessionTracker::default(),
            StdRng::seed_from_u64(1),
            TensorRegistry::new(),
            DiversitySampler::default(),
            ConfidenceCalibrator::default(),
            ConfidenceThresholds::default(),
        )
    }

    #[test]
    fn test_missing_model_uses_synthetic_prediction() {
        let mut context = context_without_model();
        let frame = Frame::from(DynamicImage::new_rgb8(32, 24));
        for _ in 0..10 {
            let detection = context.analyze_frame(&frame).unwrap();
            assert_eq!(detection.model_used, "synthetic");
            assert!(detection.species_index < 10);
            assert!((0.12..=0.98).contains(&detection.calibrated_confidence));
        }
        assert_eq!(context.registry().live(), 0);
        assert_eq!(context.session().stats().total_detections, 10);
    }

    #[test]
    fn test_bad_frame_is_surfaced_and_not_recorded() {
        let mut context = context_without_model();
        let result = context.analyze_frame(&Frame::Encoded(vec![0, 1, 2, 3]));
        assert!(result.unwrap_err().is_frame_error());
        assert_eq!(context.session().stats().total_detections, 0);
        assert_eq!(context.registry().live(), 0);
    }

    #[test]
    fn test_detection_records_bias() {
        let mut context = context_without_model();
        let frame = Frame::from(DynamicImage::new_rgb8(8, 8));
        let detection = context.analyze_frame(&frame).unwrap();
        assert_eq!(
            context.session().biased_species(),
            Some(detection.species_index)
        );
    }
}
