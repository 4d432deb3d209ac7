//! Configuration validation.

use crate::config::Config;
use crate::constants::confidence;
use crate::detection::ConfidenceThresholds;
use crate::model::ArchitectureKind;
use crate::sampling::{CalibrationParams, SamplerParams};
use crate::constants::session::{MAX_HISTORY_CAPACITY, MIN_HISTORY_CAPACITY};
use crate::constants::{MAX_CATALOG_SIZE, MIN_MONITOR_INTERVAL_MS};
use crate::error::{Error, Result};

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be between 0 and 1, got {value}")))
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (confidence::MIN..=confidence::MAX).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{name} must be between {} and {}, got {value}",
            confidence::MIN,
            confidence::MAX
        )))
    }
}

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_model(config)?;
    validate_sampler(&config.sampler)?;
    validate_calibration(&config.calibration)?;
    validate_history_capacity(config.session.history_capacity)?;
    validate_thresholds(&config.thresholds)?;

    if config.monitor.interval_ms < MIN_MONITOR_INTERVAL_MS {
        return Err(invalid(format!(
            "monitor.interval_ms must be at least {MIN_MONITOR_INTERVAL_MS}, got {}",
            config.monitor.interval_ms
        )));
    }

    Ok(())
}

fn validate_model(config: &Config) -> Result<()> {
    let model = &config.model;

    if model.strategies.is_empty() {
        return Err(invalid("model.strategies must not be empty".to_string()));
    }

    // Each tier at most once, in tier order.
    for pair in model.strategies.windows(2) {
        if pair[0] == pair[1] {
            return Err(invalid(format!("model.strategies lists {} twice", pair[0])));
        }
        if tier_rank(pair[0]) > tier_rank(pair[1]) {
            return Err(invalid(format!(
                "model.strategies must run remote-pretrained, custom-built, minimal-fallback \
                 in that order; {} cannot follow {}",
                pair[1], pair[0]
            )));
        }
    }
    if model.strategies.last() != Some(&ArchitectureKind::MinimalFallback) {
        return Err(invalid(format!(
            "model.strategies must end with {}",
            ArchitectureKind::MinimalFallback
        )));
    }

    if model.input_edge == 0 {
        return Err(invalid("model.input_edge must be positive".to_string()));
    }

    Ok(())
}

fn tier_rank(kind: ArchitectureKind) -> u8 {
    match kind {
        ArchitectureKind::RemotePretrained => 0,
        ArchitectureKind::CustomBuilt => 1,
        ArchitectureKind::MinimalFallback => 2,
    }
}

/// Validate sampler tunables.
pub fn validate_sampler(sampler: &SamplerParams) -> Result<()> {
    if sampler.top_k == 0 || sampler.top_k > MAX_CATALOG_SIZE {
        return Err(invalid(format!(
            "sampler.top_k must be between 1 and {MAX_CATALOG_SIZE}, got {}",
            sampler.top_k
        )));
    }
    check_probability("sampler.exploit_probability", sampler.exploit_probability)?;
    if !(sampler.rank_decay > 0.0 && sampler.rank_decay <= 1.0) {
        return Err(invalid(format!(
            "sampler.rank_decay must be in (0, 1], got {}",
            sampler.rank_decay
        )));
    }
    check_unit("sampler.probability_floor", sampler.probability_floor)
}

/// Validate calibrator tunables.
pub fn validate_calibration(c: &CalibrationParams) -> Result<()> {
    for (name, value) in [
        ("calibration.raw_threshold", c.raw_threshold),
        ("calibration.boost_ceiling", c.boost_ceiling),
        ("calibration.boosted_min", c.boosted_min),
        ("calibration.boosted_max", c.boosted_max),
        ("calibration.fabricated_min", c.fabricated_min),
        ("calibration.fabricated_max", c.fabricated_max),
        ("calibration.bias_ceiling", c.bias_ceiling),
        ("calibration.floor", c.floor),
    ] {
        check_unit(name, value)?;
    }
    check_probability("calibration.bias_probability", c.bias_probability)?;

    if c.boost_scale <= 0.0 || !c.boost_scale.is_finite() {
        return Err(invalid(format!(
            "calibration.boost_scale must be positive, got {}",
            c.boost_scale
        )));
    }
    if !(0.0..=0.5).contains(&c.jitter) || !(0.0..=0.5).contains(&c.bias_bonus) {
        return Err(invalid(
            "calibration.jitter and calibration.bias_bonus must be between 0 and 0.5".to_string(),
        ));
    }
    if c.boosted_min > c.boosted_max {
        return Err(invalid(format!(
            "calibration.boosted_min ({}) exceeds boosted_max ({})",
            c.boosted_min, c.boosted_max
        )));
    }
    if c.fabricated_min > c.fabricated_max {
        return Err(invalid(format!(
            "calibration.fabricated_min ({}) exceeds fabricated_max ({})",
            c.fabricated_min, c.fabricated_max
        )));
    }
    if c.floor > c.bias_ceiling {
        return Err(invalid(format!(
            "calibration.floor ({}) exceeds bias_ceiling ({})",
            c.floor, c.bias_ceiling
        )));
    }

    Ok(())
}

/// Validate a session history capacity.
pub fn validate_history_capacity(capacity: usize) -> Result<()> {
    if !(MIN_HISTORY_CAPACITY..=MAX_HISTORY_CAPACITY).contains(&capacity) {
        return Err(invalid(format!(
            "session.history_capacity must be between {MIN_HISTORY_CAPACITY} and \
             {MAX_HISTORY_CAPACITY}, got {capacity}"
        )));
    }
    Ok(())
}

/// Validate confidence level thresholds.
pub fn validate_thresholds(t: &ConfidenceThresholds) -> Result<()> {
    check_unit("thresholds.high", t.high)?;
    check_unit("thresholds.medium", t.medium)?;
    if t.medium > t.high {
        return Err(invalid(format!(
            "thresholds.medium ({}) exceeds thresholds.high ({})",
            t.medium, t.high
        )));
    }
    Ok(())
}
