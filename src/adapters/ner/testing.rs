//! In-memory runtime for unit tests

use super::traits::{
    InferenceError, LoadOptions, ModelInfo, NerModel, NerPipeline, NerRuntime, NerTokenizer,
    RawSpan,
};
use crate::config::Aggregation;
use crate::domain::Result;
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runtime returning canned spans and counting model loads
pub struct MockRuntime {
    labels: Vec<String>,
    spans: Vec<RawSpan>,
    failure: Option<InferenceError>,
    loads: AtomicUsize,
}

impl MockRuntime {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            spans: Vec::new(),
            failure: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_spans(mut self, spans: Vec<RawSpan>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_failure(mut self, failure: InferenceError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

struct MockTokenizer(String);

impl NerTokenizer for MockTokenizer {
    fn id(&self) -> &str {
        &self.0
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct MockModel {
    id: String,
    labels: Vec<String>,
}

impl NerModel for MockModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn label_vocabulary(&self) -> BTreeSet<String> {
        self.labels.iter().cloned().collect()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            class_name: "MockForTokenClassification".to_string(),
            model_type: Some("mock".to_string()),
            name_or_path: self.id.clone(),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct MockPipeline {
    model: Arc<dyn NerModel>,
    spans: Vec<RawSpan>,
    failure: Option<InferenceError>,
    aggregation: Aggregation,
}

impl NerPipeline for MockPipeline {
    fn infer(&self, _text: &str) -> std::result::Result<Vec<RawSpan>, InferenceError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.spans.clone()),
        }
    }

    fn label_vocabulary(&self) -> BTreeSet<String> {
        self.model.label_vocabulary()
    }

    fn model_info(&self) -> ModelInfo {
        self.model.info()
    }

    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }
}

impl NerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn version(&self) -> String {
        "0.0.0".to_string()
    }

    fn load_tokenizer(&self, id: &str, _options: &LoadOptions<'_>) -> Result<Arc<dyn NerTokenizer>> {
        Ok(Arc::new(MockTokenizer(id.to_string())))
    }

    fn load_model(&self, id: &str, _options: &LoadOptions<'_>) -> Result<Arc<dyn NerModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockModel {
            id: id.to_string(),
            labels: self.labels.clone(),
        }))
    }

    fn pipeline(
        &self,
        _tokenizer: Arc<dyn NerTokenizer>,
        model: Arc<dyn NerModel>,
        aggregation: Aggregation,
    ) -> Result<Box<dyn NerPipeline>> {
        Ok(Box::new(MockPipeline {
            model,
            spans: self.spans.clone(),
            failure: self.failure.clone(),
            aggregation,
        }))
    }
}
