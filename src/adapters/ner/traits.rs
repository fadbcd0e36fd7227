//! Trait seam between the detection task and NER inference runtimes
//!
//! A runtime loads tokenizers and models (the expensive part) and assembles
//! them into pipelines (cheap). Loaded tokenizer/model pairs are what the
//! engine cache keeps; pipelines are rebuilt around them on every task
//! construction because the aggregation strategy may differ.

use crate::config::{Aggregation, SecretString};
use crate::domain::Result;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// A raw span returned by a pipeline
///
/// Offsets are character offsets into the analyzed text. Aggregating
/// pipelines fill `entity_group`; per-token output only has `entity`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
    pub entity_group: Option<String>,
    pub entity: Option<String>,
    pub score: f32,
}

impl RawSpan {
    /// An aggregated span
    pub fn grouped(start: usize, end: usize, label: impl Into<String>, score: f32) -> Self {
        Self {
            start,
            end,
            entity_group: Some(label.into()),
            entity: None,
            score,
        }
    }

    /// A per-token span, as produced without aggregation
    pub fn token(start: usize, end: usize, label: impl Into<String>, score: f32) -> Self {
        Self {
            start,
            end,
            entity_group: None,
            entity: Some(label.into()),
            score,
        }
    }
}

/// Failure raised by a runtime during inference
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct InferenceError {
    /// Short name of the failure class (e.g. `TokenizerError`)
    pub kind: String,
    pub message: String,
}

impl InferenceError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Descriptive model metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Implementation class (e.g. `BertForTokenClassification`)
    pub class_name: String,
    /// Architecture family (e.g. `bert`)
    pub model_type: Option<String>,
    /// Identifier or path the model was loaded from
    pub name_or_path: String,
}

/// Inputs for loading a tokenizer or model
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    /// `model_params` from the model spec
    pub params: &'a BTreeMap<String, Value>,
    /// Hub access token, for gated repositories
    pub auth_token: Option<&'a SecretString>,
}

/// A loaded tokenizer
pub trait NerTokenizer: Send + Sync {
    fn id(&self) -> &str;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A loaded token-classification model
pub trait NerModel: Send + Sync {
    fn id(&self) -> &str;

    /// Raw labels the model produces (e.g. `O`, `B-PER`, `I-PER`)
    fn label_vocabulary(&self) -> BTreeSet<String>;

    fn info(&self) -> ModelInfo;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A ready-to-invoke inference unit for one language
pub trait NerPipeline: Send + Sync {
    /// Runs the model over `text`
    fn infer(&self, text: &str) -> std::result::Result<Vec<RawSpan>, InferenceError>;

    /// Raw labels of the underlying model
    fn label_vocabulary(&self) -> BTreeSet<String>;

    fn model_info(&self) -> ModelInfo;

    fn aggregation(&self) -> Aggregation;
}

/// An inference runtime able to load models and build pipelines
pub trait NerRuntime: Send + Sync {
    /// Runtime name, for diagnostics
    fn name(&self) -> &str;

    /// Runtime version, for diagnostics
    fn version(&self) -> String;

    /// Loads a tokenizer (may hit the network or disk)
    fn load_tokenizer(&self, id: &str, options: &LoadOptions<'_>) -> Result<Arc<dyn NerTokenizer>>;

    /// Loads a model (may hit the network or disk)
    fn load_model(&self, id: &str, options: &LoadOptions<'_>) -> Result<Arc<dyn NerModel>>;

    /// Builds a pipeline around an already loaded pair
    fn pipeline(
        &self,
        tokenizer: Arc<dyn NerTokenizer>,
        model: Arc<dyn NerModel>,
        aggregation: Aggregation,
    ) -> Result<Box<dyn NerPipeline>>;
}

/// Entity labels a pipeline produces: BIO/IOB prefixes stripped, `O` dropped
pub fn ner_labels(pipeline: &dyn NerPipeline) -> BTreeSet<String> {
    strip_label_prefixes(pipeline.label_vocabulary())
}

/// Strips BIO/IOB prefixes from raw labels and drops the outside label
pub fn strip_label_prefixes<I>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    labels
        .into_iter()
        .filter_map(|label| label.rsplit('-').next().map(str::to_string))
        .filter(|label| label != "O")
        .collect()
}
