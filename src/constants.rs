//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "wildwatch";

/// Default square input edge for constructed architectures.
pub const DEFAULT_INPUT_EDGE: u32 = 224;

/// Smallest input edge the custom-built architecture accepts.
pub const CUSTOM_MIN_INPUT_EDGE: u32 = 32;

/// Number of colour channels fed to every classifier.
pub const INPUT_CHANNELS: usize = 3;

/// Neutral gray used to pad letterboxed frames.
pub const LETTERBOX_GRAY: u8 = 128;

/// Default seed for constructed architecture weights.
pub const DEFAULT_WEIGHT_SEED: u64 = 42;

/// Default monitoring poll interval in milliseconds.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2500;

/// Shortest accepted monitoring interval in milliseconds.
pub const MIN_MONITOR_INTERVAL_MS: u64 = 10;

/// Upper bound on catalog size accepted from a catalog source.
pub const MAX_CATALOG_SIZE: usize = 100_000;

/// Name reported for unresolved catalog indices.
pub const UNKNOWN_SPECIES: &str = "Unknown Species";

/// Placeholder for unknown descriptor text fields.
pub const UNKNOWN: &str = "Unknown";

/// Diversity sampler defaults.
pub mod sampler {
    /// Number of top-ranked candidates considered by the weighted branch.
    pub const TOP_K: usize = 5;

    /// Probability of taking the weighted top-K branch (the rest explores).
    pub const EXPLOIT_PROBABILITY: f64 = 0.7;

    /// Exponential decay applied per rank in the weighted branch.
    pub const RANK_DECAY: f64 = 0.7;

    /// Probability reported for explored classes outside the top K.
    pub const PROBABILITY_FLOOR: f32 = 0.001;
}

/// Confidence calibrator defaults.
pub mod calibration {
    /// Raw probabilities at or below this are treated as fabricated.
    pub const RAW_THRESHOLD: f32 = 0.001;

    /// Multiplier applied to the raw probability.
    pub const BOOST_SCALE: f32 = 15.0;

    /// Offset added after scaling.
    pub const BOOST_OFFSET: f32 = 0.2;

    /// Upper bound of the boosted value before jitter.
    pub const BOOST_CEILING: f32 = 0.95;

    /// Half-width of the uniform jitter.
    pub const JITTER: f32 = 0.05;

    /// Lower clamp after jitter.
    pub const BOOSTED_MIN: f32 = 0.15;

    /// Upper clamp after jitter.
    pub const BOOSTED_MAX: f32 = 0.95;

    /// Range used for fabricated confidences (raw at or below threshold).
    pub const FABRICATED_RANGE: (f32, f32) = (0.15, 0.30);

    /// Probability of sticking with the session's biased species.
    pub const SESSION_BIAS_PROBABILITY: f64 = 0.8;

    /// Bonus added when the biased species is kept.
    pub const BIAS_BONUS: f32 = 0.05;

    /// Ceiling after the bias bonus.
    pub const BIAS_CEILING: f32 = 0.98;

    /// Absolute floor of any reported confidence.
    pub const FLOOR: f32 = 0.12;
}

/// Session tracker limits.
pub mod session {
    /// Smallest allowed history capacity.
    pub const MIN_HISTORY_CAPACITY: usize = 10;

    /// Largest allowed history capacity.
    pub const MAX_HISTORY_CAPACITY: usize = 20;

    /// Default history capacity.
    pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

    /// Entries kept when diversity is forced.
    pub const DIVERSE_HISTORY_LEN: usize = 5;
}

/// Accuracy estimates recorded per provider tier.
pub mod accuracy {
    /// Remote pre-trained weights.
    pub const REMOTE_PRETRAINED: f32 = 0.85;
    /// Locally constructed architecture.
    pub const CUSTOM_BUILT: f32 = 0.65;
    /// Minimal fallback architecture.
    pub const MINIMAL_FALLBACK: f32 = 0.45;
}

/// Confidence level thresholds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Default lower bound of the "high" level.
    pub const DEFAULT_HIGH: f32 = 0.85;
    /// Default lower bound of the "medium" level.
    pub const DEFAULT_MEDIUM: f32 = 0.65;
    /// Decimal places for confidence formatting.
    pub const DECIMAL_PLACES: usize = 4;
}

/// Fixed compile configuration for constructed architectures.
pub mod compile {
    /// Optimizer name.
    pub const OPTIMIZER: &str = "adam";
    /// Learning rate.
    pub const LEARNING_RATE: f64 = 0.001;
    /// Adam epsilon, matching the Keras default.
    pub const ADAM_EPSILON: f32 = 1e-7;
    /// Loss function name.
    pub const LOSS: &str = "categorical_crossentropy";
}

/// Network timeouts for remote model downloads.
pub mod download {
    /// Connect timeout in seconds.
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;
    /// Whole-request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
}

/// Supported image file extensions for frame collection.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
