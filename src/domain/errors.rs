//! Domain error types
//!
//! A single error enum is used across the plugin. Each variant carries a
//! human-readable message; [`PluginError::kind`] gives callers a coarse
//! classification to branch on (e.g. offering "install X" guidance for a
//! missing inference runtime instead of a generic configuration message).

use thiserror::Error;

/// Main plugin error type
#[derive(Debug, Error)]
pub enum PluginError {
    /// Malformed or incomplete configuration, raised at task construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The inference runtime is not available in this build
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Runtime detection failure, raised per `find()` call
    #[error("Processing error: {0}")]
    Processing(String),

    /// Filesystem failure while preparing plugin resources
    #[error("File error: {0}")]
    File(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    MissingDependency,
    Processing,
    Io,
}

impl PluginError {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Serialization(_) => ErrorKind::Config,
            Self::MissingDependency(_) => ErrorKind::MissingDependency,
            Self::Processing(_) => ErrorKind::Processing,
            Self::File(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns the bare message, without the kind prefix added by `Display`
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(m)
            | Self::MissingDependency(m)
            | Self::Processing(m)
            | Self::File(m)
            | Self::Io(m)
            | Self::Serialization(m) => m,
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    pub fn is_processing(&self) -> bool {
        self.kind() == ErrorKind::Processing
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PluginError {
    fn from(err: toml::de::Error) -> Self {
        PluginError::Configuration(format!("TOML parse error: {err}"))
    }
}
