//! Configuration type definitions.

use crate::constants::{DEFAULT_INPUT_EDGE, DEFAULT_MONITOR_INTERVAL_MS, DEFAULT_WEIGHT_SEED};
use crate::constants::session::DEFAULT_HISTORY_CAPACITY;
use crate::detection::ConfidenceThresholds;
use crate::model::{ArchitectureKind, ModelStrategy};
use crate::sampling::{CalibrationParams, SamplerParams};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Species catalog settings.
    pub catalog: CatalogConfig,

    /// Model provider chain settings.
    pub model: ModelConfig,

    /// Diversity sampler settings.
    pub sampler: SamplerParams,

    /// Confidence calibration settings.
    pub calibration: CalibrationParams,

    /// Session tracker settings.
    pub session: SessionConfig,

    /// Monitoring loop settings.
    pub monitor: MonitorConfig,

    /// Confidence level thresholds.
    pub thresholds: ConfidenceThresholds,

    /// Output settings.
    pub output: OutputConfig,
}

/// Species catalog settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog JSON file. The built-in catalog is used when unset.
    pub path: Option<PathBuf>,
}

/// Model provider chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Tiers to try, in order.
    pub strategies: Vec<ArchitectureKind>,

    /// Input edge for locally constructed architectures.
    pub input_edge: u32,

    /// Descriptor path or URL for remote pre-trained weights.
    pub descriptor: Option<String>,

    /// Download cache for remote weights.
    pub cache_dir: Option<PathBuf>,

    /// Seed for constructed architecture weights.
    pub weight_seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                ArchitectureKind::RemotePretrained,
                ArchitectureKind::CustomBuilt,
                ArchitectureKind::MinimalFallback,
            ],
            input_edge: DEFAULT_INPUT_EDGE,
            descriptor: None,
            cache_dir: None,
            weight_seed: DEFAULT_WEIGHT_SEED,
        }
    }
}

impl ModelConfig {
    /// Provider strategies in configured order.
    pub fn provider_strategies(&self) -> Vec<ModelStrategy> {
        self.strategies
            .iter()
            .map(|kind| match kind {
                ArchitectureKind::RemotePretrained => ModelStrategy::RemotePretrained {
                    descriptor: self.descriptor.clone(),
                    cache_dir: self.cache_dir.clone(),
                },
                ArchitectureKind::CustomBuilt => ModelStrategy::CustomBuilt,
                ArchitectureKind::MinimalFallback => ModelStrategy::MinimalFallback,
            })
            .collect()
    }
}

/// Session tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detections kept for statistics (10-20).
    pub history_capacity: usize,

    /// Fixed RNG seed for reproducible sessions.
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            rng_seed: None,
        }
    }
}

/// Monitoring loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// CSV with a header row.
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" | "jsonl" | "ndjson" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("csv".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
        assert_eq!(
            "JSONL".parse::<OutputFormat>().ok(),
            Some(OutputFormat::Json)
        );
        assert_eq!("txt".parse::<OutputFormat>().ok(), Some(OutputFormat::Text));
        assert!("raven".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_default_strategies_follow_tier_order() {
        let model = ModelConfig::default();
        let strategies = model.provider_strategies();
        assert_eq!(strategies.len(), 3);
        assert_eq!(strategies[0].kind(), ArchitectureKind::RemotePretrained);
        assert_eq!(strategies[2], ModelStrategy::MinimalFallback);
    }

    #[test]
    fn test_descriptor_flows_into_remote_strategy() {
        let model = ModelConfig {
            descriptor: Some("https://example.org/d.json".to_string()),
            strategies: vec![ArchitectureKind::RemotePretrained],
            ..ModelConfig::default()
        };
        assert_eq!(
            model.provider_strategies()[0],
            ModelStrategy::RemotePretrained {
                descriptor: Some("https://example.org/d.json".to_string()),
                cache_dir: None,
            }
        );
    }
}
