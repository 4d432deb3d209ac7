//! Confidence calibration.
//!
//! Raw softmax probabilities from an untrained or small classifier are
//! tiny. The calibrator maps them onto a user-facing scale and keeps a
//! session leaning towards the species it has been reporting.

use crate::constants::calibration as defaults;
use crate::session::SessionTracker;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunables for [`ConfidenceCalibrator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Raw probabilities at or below this get a fabricated confidence.
    pub raw_threshold: f32,
    /// Multiplier of the boost.
    pub boost_scale: f32,
    /// Offset of the boost.
    pub boost_offset: f32,
    /// Cap of the boost before jitter.
    pub boost_ceiling: f32,
    /// Half-width of the uniform jitter.
    pub jitter: f32,
    /// Lower clamp after jitter.
    pub boosted_min: f32,
    /// Upper clamp after jitter.
    pub boosted_max: f32,
    /// Lower bound of fabricated confidences.
    pub fabricated_min: f32,
    /// Upper bound of fabricated confidences.
    pub fabricated_max: f32,
    /// Probability of keeping the session's biased species.
    pub bias_probability: f64,
    /// Added when the biased species is kept.
    pub bias_bonus: f32,
    /// Cap after the bias bonus.
    pub bias_ceiling: f32,
    /// Absolute floor.
    pub floor: f32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            raw_threshold: defaults::RAW_THRESHOLD,
            boost_scale: defaults::BOOST_SCALE,
            boost_offset: defaults::BOOST_OFFSET,
            boost_ceiling: defaults::BOOST_CEILING,
            jitter: defaults::JITTER,
            boosted_min: defaults::BOOSTED_MIN,
            boosted_max: defaults::BOOSTED_MAX,
            fabricated_min: defaults::FABRICATED_RANGE.0,
            fabricated_max: defaults::FABRICATED_RANGE.1,
            bias_probability: defaults::SESSION_BIAS_PROBABILITY,
            bias_bonus: defaults::BIAS_BONUS,
            bias_ceiling: defaults::BIAS_CEILING,
            floor: defaults::FLOOR,
        }
    }
}

/// Calibrated selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrated {
    /// Species to report.
    pub index: usize,
    /// User-facing confidence.
    pub confidence: f32,
    /// Whether the session bias replaced the sampled species.
    pub kept_bias: bool,
}

/// Maps raw probabilities to user-facing confidences.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceCalibrator {
    params: CalibrationParams,
}

impl ConfidenceCalibrator {
    /// Create a calibrator.
    pub fn new(params: CalibrationParams) -> Self {
        Self { params }
    }

    /// Active parameters.
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Calibrate the sampled `selected` class with raw probability `raw`.
    pub fn calibrate<R: Rng>(
        &self,
        raw: f32,
        selected: usize,
        session: &SessionTracker,
        rng: &mut R,
    ) -> Calibrated {
        let p = &self.params;

        let mut confidence = if raw > p.raw_threshold {
            let boosted = raw.mul_add(p.boost_scale, p.boost_offset).min(p.boost_ceiling);
            let jitter = rng.random_range(-p.jitter..=p.jitter);
            (boosted + jitter).clamp(p.boosted_min, p.boosted_max)
        } else {
            rng.random_range(p.fabricated_min..=p.fabricated_max)
        };

        let mut index = selected;
        let mut kept_bias = false;
        if let Some(biased) = session.biased_species()
            && rng.random_bool(p.bias_probability)
        {
            index = biased;
            confidence = (confidence + p.bias_bonus).min(p.bias_ceiling);
            kept_bias = true;
        }

        Calibrated {
            index,
            confidence: confidence.max(p.floor),
            kept_bias,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::detection::{ConfidenceLevel, Detection};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn biased_session(index: usize) -> SessionTracker {
        let catalog = default_catalog();
        let mut session = SessionTracker::default();
        session.record(Detection {
            species_index: index,
            species: Arc::clone(catalog.get(index).unwrap()),
            raw_confidence: 0.3,
            calibrated_confidence: 0.6,
            confidence_level: ConfidenceLevel::Low,
            model_used: "test".to_string(),
            processing_time_ms: 1,
            timestamp: chrono::Utc::now(),
        });
        session
    }

    #[test]
    fn test_output_range() {
        let calibrator = ConfidenceCalibrator::default();
        let fresh = SessionTracker::default();
        let biased = biased_session(2);
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..2000 {
            let raw = (i % 100) as f32 / 100.0;
            for session in [&fresh, &biased] {
                let c = calibrator.calibrate(raw, 1, session, &mut rng);
                assert!((0.12..=0.98).contains(&c.confidence), "{}", c.confidence);
            }
        }
    }

    #[test]
    fn test_boost_without_bias() {
        let params = CalibrationParams {
            jitter: 0.0,
            ..CalibrationParams::default()
        };
        let calibrator = ConfidenceCalibrator::new(params);
        let session = SessionTracker::default();
        let mut rng = StdRng::seed_from_u64(1);

        let c = calibrator.calibrate(0.02, 4, &session, &mut rng);
        assert_eq!(c.index, 4);
        assert!((c.confidence - 0.5).abs() < 1e-5);
        assert!(!c.kept_bias);

        let c = calibrator.calibrate(0.9, 4, &session, &mut rng);
        assert!((c.confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_fabricated_range_for_tiny_raw() {
        let calibrator = ConfidenceCalibrator::default();
        let session = SessionTracker::default();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let c = calibrator.calibrate(0.0005, 0, &session, &mut rng);
            assert!((0.15..=0.30).contains(&c.confidence));
        }
    }

    #[test]
    fn test_bias_is_kept_about_eighty_percent() {
        let calibrator = ConfidenceCalibrator::default();
        let session = biased_session(3);
        let mut rng = StdRng::seed_from_u64(99);
        let runs = 5000;
        let mut kept = 0;
        for _ in 0..runs {
            let c = calibrator.calibrate(0.05, 7, &session, &mut rng);
            if c.kept_bias {
                assert_eq!(c.index, 3);
                kept += 1;
            } else {
                assert_eq!(c.index, 7);
            }
        }
        let ratio = f64::from(kept) / f64::from(runs);
        assert!((0.76..0.84).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn test_bias_bonus_is_capped() {
        let params = CalibrationParams {
            jitter: 0.0,
            bias_probability: 1.0,
            ..CalibrationParams::default()
        };
        let calibrator = ConfidenceCalibrator::new(params);
        let session = biased_session(0);
        let mut rng = StdRng::seed_from_u64(4);
        let c = calibrator.calibrate(0.99, 5, &session, &mut rng);
        assert_eq!(c.index, 0);
        assert!((c.confidence - 0.98).abs() < 1e-6);
    }
}
