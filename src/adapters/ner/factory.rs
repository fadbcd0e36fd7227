//! Inference runtime factory
//!
//! This module selects the NER runtime compiled into the crate.

use crate::adapters::ner::traits::NerRuntime;
use crate::domain::Result;
use std::sync::Arc;

/// Create the default inference runtime
///
/// # Returns
///
/// Returns an Arc-wrapped trait object that implements NerRuntime
///
/// # Errors
///
/// Returns a missing-dependency error if the crate was built without an
/// inference backend (the `onnx` feature)
#[cfg(feature = "onnx")]
pub fn default_runtime() -> Result<Arc<dyn NerRuntime>> {
    tracing::debug!("Creating ONNX Runtime NER backend");
    Ok(Arc::new(crate::adapters::ner::onnx::OnnxRuntime::new()) as Arc<dyn NerRuntime>)
}

/// Create the default inference runtime
///
/// # Errors
///
/// Always fails: the crate was built without an inference backend
#[cfg(not(feature = "onnx"))]
pub fn default_runtime() -> Result<Arc<dyn NerRuntime>> {
    Err(crate::domain::PluginError::MissingDependency(
        "no NER inference runtime available (build with the `onnx` feature)".to_string(),
    ))
}
