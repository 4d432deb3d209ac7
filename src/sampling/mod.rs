//! Class selection and confidence calibration.

mod calibrator;
mod sampler;

pub use calibrator::{Calibrated, CalibrationParams, ConfidenceCalibrator};
pub use sampler::{DiversitySampler, Sample, SamplerParams};
