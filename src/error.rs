//! Error types for wildwatch.

use crate::model::ArchitectureKind;

/// Result type alias for wildwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for wildwatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Cache directory could not be determined.
    #[error("could not determine cache directory for this platform")]
    CacheDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Species catalog source missing or malformed.
    #[error("species catalog unavailable from '{source_name}': {reason}")]
    CatalogUnavailable {
        /// Path or label of the catalog source.
        source_name: String,
        /// Why the catalog could not be used.
        reason: String,
    },

    /// A single model provider tier failed.
    #[error("{tier} model failed to load: {reason}")]
    ModelLoad {
        /// Tier that failed.
        tier: ArchitectureKind,
        /// Description of the failure.
        reason: String,
    },

    /// Every model provider tier failed.
    #[error("initialization failed: {reason}")]
    Initialization {
        /// Description of the fatal failure.
        reason: String,
    },

    /// Detector used before `initialize` completed.
    #[error("detector is not initialized")]
    NotInitialized,

    /// Frame could not be turned into a tensor.
    #[error("failed to preprocess frame: {reason}")]
    Preprocess {
        /// Description of the preprocessing failure.
        reason: String,
    },

    /// Encoded frame could not be decoded.
    #[error("failed to decode frame")]
    FrameDecode {
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to open an image file.
    #[error("failed to open image file '{path}'")]
    ImageOpen {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Failed to read model descriptor.
    #[error("failed to read model descriptor '{location}'")]
    DescriptorRead {
        /// Path or URL of the descriptor.
        location: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse model descriptor.
    #[error("failed to parse model descriptor '{location}'")]
    DescriptorParse {
        /// Path or URL of the descriptor.
        location: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Download failed.
    #[error("failed to download from '{url}'")]
    DownloadFailed {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Downloaded file did not match its published checksum.
    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path to the downloaded file.
        path: std::path::PathBuf,
        /// Expected SHA-256 hex digest.
        expected: String,
        /// Computed SHA-256 hex digest.
        actual: String,
    },

    /// No valid image files found.
    #[error("no valid image files found in the provided paths")]
    NoValidImageFiles,

    /// Failed to write CSV output.
    #[error("failed to write CSV output")]
    CsvWrite {
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output.
    #[error("failed to write JSON output")]
    JsonWrite {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether the analysis loop should skip this frame and keep going.
    pub const fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::Preprocess { .. } | Self::FrameDecode { .. } | Self::ImageOpen { .. }
        )
    }
}
