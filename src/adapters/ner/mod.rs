//! NER inference runtime integration
//!
//! This module provides the trait seam the detection task talks to, the
//! token aggregation shared by backends, and the runtime factory.
//! The ONNX Runtime backend is compiled in with the `onnx` feature.

pub mod aggregate;
pub mod factory;
#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;

pub use aggregate::{aggregate, TokenScores};
pub use factory::default_runtime;
pub use traits::{
    ner_labels, strip_label_prefixes, InferenceError, LoadOptions, ModelInfo, NerModel,
    NerPipeline, NerRuntime, NerTokenizer, RawSpan,
};
