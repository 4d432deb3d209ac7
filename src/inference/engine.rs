//! Forward pass and raw predictions.

use crate::error::{Error, Result};
use crate::model::{LoadedModel, Tensor, TensorRegistry};
use rand::Rng;

/// Tolerance when checking that model output already sums to one.
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Probability per catalog index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    /// One probability per class.
    pub probabilities: Vec<f32>,
}

impl RawPrediction {
    /// Number of classes.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Probability of one class (0 when out of range).
    pub fn probability(&self, index: usize) -> f32 {
        self.probabilities.get(index).copied().unwrap_or(0.0)
    }

    /// The `k` most likely classes, highest first. Ties keep index order.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self.probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }

    /// Near-uniform prediction used when inference fails.
    pub fn synthetic<R: Rng>(num_classes: usize, rng: &mut R) -> Self {
        let weights: Vec<f32> = (0..num_classes)
            .map(|_| rng.random_range(0.5f32..1.5))
            .collect();
        let total: f32 = weights.iter().sum();
        Self {
            probabilities: weights.into_iter().map(|w| w / total).collect(),
        }
    }
}

/// Run `model` on `input`, consuming the tensor.
///
/// The output must have one entry per catalog class. Scores that are not
/// already a probability distribution are passed through softmax.
pub fn predict(
    input: Tensor,
    model: Option<&LoadedModel>,
    registry: &TensorRegistry,
    num_classes: usize,
) -> Result<RawPrediction> {
    let model = model.ok_or_else(|| Error::Inference {
        reason: "no model loaded".to_string(),
    })?;

    let expected_edge = model.input_edge() as usize;
    if input.shape().get(1..3) != Some(&[expected_edge, expected_edge][..]) {
        return Err(Error::Inference {
            reason: format!(
                "input shape {:?} does not match model edge {expected_edge}",
                input.shape()
            ),
        });
    }

    let scores = model.forward(&input, registry)?;
    drop(input);

    if scores.len() != num_classes {
        return Err(Error::Inference {
            reason: format!(
                "model produced {} scores for {num_classes} classes",
                scores.len()
            ),
        });
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(Error::Inference {
            reason: "model produced non-finite scores".to_string(),
        });
    }

    Ok(RawPrediction {
        probabilities: into_distribution(scores),
    })
}

fn into_distribution(mut scores: Vec<f32>) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let is_distribution =
        scores.iter().all(|s| *s >= 0.0) && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE;
    if is_distribution {
        return scores;
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    for s in &mut scores {
        *s = (*s - max).exp();
    }
    let total: f32 = scores.iter().sum();
    for s in &mut scores {
        *s /= total;
    }
    scores
}
