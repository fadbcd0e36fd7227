//! Shared helpers for integration tests

#![allow(dead_code)]

use pii_ner::adapters::ner::{
    InferenceError, LoadOptions, ModelInfo, NerModel, NerPipeline, NerRuntime, NerTokenizer,
    RawSpan,
};
use pii_ner::config::Aggregation;
use pii_ner::domain::{LangCode, Result};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serializes tests that read or write process environment variables
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

pub const TURING: &str = "Alan Turing. considered the father of AI, was born in England";
pub const TURING_ES: &str = "Alan Turing, considerado el padre de la IA, nació en Inglaterra";

pub fn lang(code: &str) -> LangCode {
    LangCode::new(code).expect("valid language code")
}

/// Canned spans for [`TURING`], unsorted; the location span has a leading space
pub fn turing_spans() -> Vec<RawSpan> {
    vec![
        RawSpan::grouped(53, 61, "LOC", 0.9993),
        RawSpan::grouped(0, 11, "PER", 0.9986),
        RawSpan::grouped(11, 12, "MISC", 0.41),
    ]
}

/// Runtime serving models with a fixed label set and canned spans
///
/// Each model id can be given its own label vocabulary; loads are counted.
pub struct CountingRuntime {
    default_labels: Vec<String>,
    labels: BTreeMap<String, Vec<String>>,
    spans: Vec<RawSpan>,
    failure: Option<InferenceError>,
    model_loads: AtomicUsize,
    tokenizer_loads: AtomicUsize,
}

impl CountingRuntime {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            default_labels: labels.iter().map(|l| l.to_string()).collect(),
            labels: BTreeMap::new(),
            spans: Vec::new(),
            failure: None,
            model_loads: AtomicUsize::new(0),
            tokenizer_loads: AtomicUsize::new(0),
        }
    }

    /// BIO labels of a CoNLL-style model
    pub fn conll() -> Self {
        Self::new(&[
            "O", "B-PER", "I-PER", "B-LOC", "I-LOC", "B-ORG", "I-ORG", "B-MISC", "I-MISC",
        ])
    }

    pub fn with_model_labels(mut self, model: &str, labels: &[&str]) -> Self {
        self.labels
            .insert(model.to_string(), labels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_spans(mut self, spans: Vec<RawSpan>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_failure(mut self, failure: InferenceError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn model_loads(&self) -> usize {
        self.model_loads.load(Ordering::SeqCst)
    }

    pub fn tokenizer_loads(&self) -> usize {
        self.tokenizer_loads.load(Ordering::SeqCst)
    }
}

struct TestTokenizer(String);

impl NerTokenizer for TestTokenizer {
    fn id(&self) -> &str {
        &self.0
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct TestModel {
    id: String,
    labels: Vec<String>,
}

impl NerModel for TestModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn label_vocabulary(&self) -> BTreeSet<String> {
        self.labels.iter().cloned().collect()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            class_name: "TestForTokenClassification".to_string(),
            model_type: Some("test".to_string()),
            name_or_path: self.id.clone(),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct TestPipeline {
    model: Arc<TestModel>,
    spans: Vec<RawSpan>,
    failure: Option<InferenceError>,
    aggregation: Aggregation,
}

impl NerPipeline for TestPipeline {
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

impl NerRuntime for CountingRuntime {
    fn name(&self) -> &str {
        "counting"
    }

    fn version(&self) -> String {
        "1.0".to_string()
    }

    fn load_tokenizer(&self, id: &str, _options: &LoadOptions<'_>) -> Result<Arc<dyn NerTokenizer>> {
        self.tokenizer_loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestTokenizer(id.to_string())))
    }

    fn load_model(&self, id: &str, _options: &LoadOptions<'_>) -> Result<Arc<dyn NerModel>> {
        self.model_loads.fetch_add(1, Ordering::SeqCst);
        let labels = self
            .labels
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.default_labels.clone());
        Ok(Arc::new(TestModel {
            id: id.to_string(),
            labels,
        }))
    }

    fn pipeline(
        &self,
        _tokenizer: Arc<dyn NerTokenizer>,
        model: Arc<dyn NerModel>,
        aggregation: Aggregation,
    ) -> Result<Box<dyn NerPipeline>> {
        let model = model
            .into_any()
            .downcast::<TestModel>()
            .map_err(|_| pii_ner::domain::PluginError::Processing("foreign model".to_string()))?;
        Ok(Box::new(TestPipeline {
            model,
            spans: self.spans.clone(),
            failure: self.failure.clone(),
            aggregation,
        }))
    }
}

/// Writes a JSON config document into `dir` and returns its path
pub fn write_json_config(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).expect("serializable"))
        .expect("Failed to write config file");
    path
}

/// Writes a TOML config document into `dir` and returns its path
pub fn write_toml_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write config file");
    path
}
