//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, load_default_config, save_config};
pub use paths::{config_dir, config_file_path, models_cache_dir};
pub use types::{
    CatalogConfig, Config, ModelConfig, MonitorConfig, OutputConfig, OutputFormat, SessionConfig,
};
pub use validate::{
    validate_calibration, validate_config, validate_history_capacity, validate_sampler,
    validate_thresholds,
};
