//! Diversity-aware class selection.

use crate::constants::sampler as defaults;
use crate::inference::RawPrediction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Tunables for [`DiversitySampler`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Candidates considered by the weighted branch.
    pub top_k: usize,
    /// Probability of the weighted branch; the remainder explores uniformly.
    pub exploit_probability: f64,
    /// Weight multiplier per rank in the weighted branch.
    pub rank_decay: f64,
    /// Probability reported for explored classes outside the top K.
    pub probability_floor: f32,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            top_k: defaults::TOP_K,
            exploit_probability: defaults::EXPLOIT_PROBABILITY,
            rank_decay: defaults::RANK_DECAY,
            probability_floor: defaults::PROBABILITY_FLOOR,
        }
    }
}

/// Outcome of one sampling step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Selected catalog index.
    pub index: usize,
    /// Raw probability of the selection, or the floor outside the top K.
    pub probability: f32,
    /// Whether the uniform exploration branch was taken.
    pub explored: bool,
}

/// Picks a class from a prediction without always taking the argmax.
#[derive(Debug, Clone, Default)]
pub struct DiversitySampler {
    params: SamplerParams,
}

impl DiversitySampler {
    /// Create a sampler.
    pub fn new(params: SamplerParams) -> Self {
        Self { params }
    }

    /// Active parameters.
    pub fn params(&self) -> &SamplerParams {
        &self.params
    }

    /// Select a class. Returns `None` for an empty prediction.
    pub fn sample<R: Rng>(&self, raw: &RawPrediction, rng: &mut R) -> Option<Sample> {
        if raw.is_empty() {
            return None;
        }

        let k = self.params.top_k.clamp(1, raw.len());
        let top = raw.top_k(k);
        trace!("Top candidates: {top:?}");

        let explored = !rng.random_bool(self.params.exploit_probability);
        let index = if explored {
            rng.random_range(0..raw.len())
        } else {
            self.weighted_pick(&top, rng)
        };

        let probability = if top.iter().any(|(i, _)| *i == index) {
            raw.probability(index)
        } else {
            self.params.probability_floor
        };

        Some(Sample {
            index,
            probability,
            explored,
        })
    }

    fn weighted_pick<R: Rng>(&self, top: &[(usize, f32)], rng: &mut R) -> usize {
        let mut weight = 1.0;
        let weights: Vec<f64> = top
            .iter()
            .map(|_| {
                let w = weight;
                weight *= self.params.rank_decay;
                w
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let mut target = rng.random::<f64>() * total;
        for ((index, _), w) in top.iter().zip(&weights) {
            if target < *w {
                return *index;
            }
            target -= w;
        }
        top.last().map_or(0, |(index, _)| *index)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn peaked(n: usize) -> RawPrediction {
        // Class i gets weight proportional to n - i, so index 0 is the argmax.
        let total: usize = (1..=n).sum();
        RawPrediction {
            probabilities: (0..n).map(|i| (n - i) as f32 / total as f32).collect(),
        }
    }

    #[test]
    fn test_index_always_in_range() {
        let sampler = DiversitySampler::default();
        let raw = peaked(10);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let s = sampler.sample(&raw, &mut rng).unwrap();
            assert!(s.index < 10);
        }
    }

    #[test]
    fn test_empty_prediction() {
        let sampler = DiversitySampler::default();
        let raw = RawPrediction {
            probabilities: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sampler.sample(&raw, &mut rng).is_none());
    }

    #[test]
    fn test_single_class_catalog() {
        let sampler = DiversitySampler::default();
        let raw = RawPrediction {
            probabilities: vec![1.0],
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let s = sampler.sample(&raw, &mut rng).unwrap();
            assert_eq!(s.index, 0);
            assert!((s.probability - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_branch_split_and_rank_preference() {
        let sampler = DiversitySampler::default();
        let raw = peaked(20);
        let mut rng = StdRng::seed_from_u64(42);
        let runs = 10_000;
        let mut explored = 0;
        let mut counts = [0usize; 20];
        for _ in 0..runs {
            let s = sampler.sample(&raw, &mut rng).unwrap();
            if s.explored {
                explored += 1;
            }
            counts[s.index] += 1;
        }

        let explore_ratio = f64::from(explored) / f64::from(runs);
        assert!((0.27..0.33).contains(&explore_ratio), "ratio {explore_ratio}");

        // Rank 0 beats rank 1 beats rank 4; tail classes only come from exploration.
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[4]);
        assert!(counts[4] > counts[10]);
        assert!(counts[19] > 0);
    }

    #[test]
    fn test_floor_outside_top_k() {
        let params = SamplerParams {
            exploit_probability: 0.0,
            ..SamplerParams::default()
        };
        let sampler = DiversitySampler::new(params);
        let raw = peaked(50);
        let mut rng = StdRng::seed_from_u64(5);
        let mut saw_floor = false;
        for _ in 0..200 {
            let s = sampler.sample(&raw, &mut rng).unwrap();
            assert!(s.explored);
            if s.index >= 5 {
                assert!((s.probability - 0.001).abs() < f32::EPSILON);
                saw_floor = true;
            } else {
                assert!((s.probability - raw.probability(s.index)).abs() < f32::EPSILON);
            }
        }
        assert!(saw_floor);
    }

    #[test]
    fn test_always_exploit_stays_in_top_k() {
        let params = SamplerParams {
            exploit_probability: 1.0,
            top_k: 3,
            ..SamplerParams::default()
        };
        let sampler = DiversitySampler::new(params);
        let raw = peaked(10);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let s = sampler.sample(&raw, &mut rng).unwrap();
            assert!(s.index < 3);
            assert!(!s.explored);
        }
    }
}
