//! ONNX Runtime inference backend
//!
//! Models are fetched from the Hugging Face hub (`tokenizer.json`,
//! `config.json` and `model.onnx` or `onnx/model.onnx`) into the hub cache
//! directory, which honours `HUGGINGFACE_HUB_CACHE`.

use super::aggregate::{aggregate, TokenScores};
use super::traits::{
    InferenceError, LoadOptions, ModelInfo, NerModel, NerPipeline, NerRuntime, NerTokenizer,
    RawSpan,
};
use crate::config::{schema::param_value, Aggregation};
use crate::domain::{PluginError, Result};
use crate::task::cachedir::ENV_HF_CACHE;
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

/// Pinned `ort` release, matching `Cargo.toml`
const ORT_VERSION: &str = "2.0.0-rc.11";

/// `model_params` keys the hub client understands
const SUPPORTED_PARAMS: &[&str] = &["revision"];

/// Architectures whose exports take a `token_type_ids` input
const TOKEN_TYPE_MODELS: &[&str] = &["bert", "electra", "albert", "mobilebert", "convbert"];

/// ONNX Runtime backed NER runtime
#[derive(Debug, Default)]
pub struct OnnxRuntime;

impl OnnxRuntime {
    pub fn new() -> Self {
        Self
    }

    fn repo(&self, id: &str, options: &LoadOptions<'_>) -> Result<ApiRepo> {
        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = std::env::var_os(ENV_HF_CACHE) {
            builder = builder.with_cache_dir(PathBuf::from(dir));
        }
        if let Some(token) = options.auth_token {
            builder = builder.with_token(Some(token.expose_secret().as_ref().to_string()));
        }
        let api = builder.build().map_err(|e| {
            PluginError::Configuration(format!("cannot initialize model hub client: {e}"))
        })?;

        for key in unsupported_params(options.params) {
            tracing::warn!(model = id, param = key, "Ignoring model parameter unsupported by onnxruntime");
        }

        let repo = match options.params.get("revision") {
            Some(rev) => Repo::with_revision(id.to_string(), RepoType::Model, param_value(rev)),
            None => Repo::new(id.to_string(), RepoType::Model),
        };
        Ok(api.repo(repo))
    }
}

fn unsupported_params(params: &BTreeMap<String, Value>) -> impl Iterator<Item = &str> {
    params
        .keys()
        .map(String::as_str)
        .filter(|key| !SUPPORTED_PARAMS.contains(key))
}

fn fetch(repo: &ApiRepo, id: &str, file: &str) -> Result<PathBuf> {
    repo.get(file)
        .map_err(|e| PluginError::File(format!("cannot fetch '{file}' for '{id}': {e}")))
}

impl NerRuntime for OnnxRuntime {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn version(&self) -> String {
        format!("ort {ORT_VERSION}")
    }

    fn load_tokenizer(&self, id: &str, options: &LoadOptions<'_>) -> Result<Arc<dyn NerTokenizer>> {
        let repo = self.repo(id, options)?;
        let path = fetch(&repo, id, "tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            PluginError::Configuration(format!("cannot load tokenizer '{id}': {e}"))
        })?;
        Ok(Arc::new(OnnxTokenizer {
            id: id.to_string(),
            tokenizer,
        }))
    }

    fn load_model(&self, id: &str, options: &LoadOptions<'_>) -> Result<Arc<dyn NerModel>> {
        let repo = self.repo(id, options)?;

        let config_path = fetch(&repo, id, "config.json")?;
        let config: Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let labels = id2label(&config).ok_or_else(|| {
            PluginError::Configuration(format!("model '{id}' config has no usable id2label"))
        })?;

        let model_path = fetch(&repo, id, "model.onnx")
            .or_else(|_| fetch(&repo, id, "onnx/model.onnx"))?;

        let session = Session::builder()
            .map_err(|e| ort_error(id, "create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ort_error(id, "set optimization level", e))?
            .commit_from_file(&model_path)
            .map_err(|e| ort_error(id, "load ONNX model", e))?;

        let info = ModelInfo {
            class_name: config
                .get("architectures")
                .and_then(|a| a.get(0))
                .and_then(Value::as_str)
                .unwrap_or("OnnxTokenClassification")
                .to_string(),
            model_type: config
                .get("model_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            name_or_path: id.to_string(),
        };

        Ok(Arc::new(OnnxModel {
            id: id.to_string(),
            session: Mutex::new(session),
            labels,
            info,
        }))
    }

    fn pipeline(
        &self,
        tokenizer: Arc<dyn NerTokenizer>,
        model: Arc<dyn NerModel>,
        aggregation: Aggregation,
    ) -> Result<Box<dyn NerPipeline>> {
        let tok_id = tokenizer.id().to_string();
        let model_id = model.id().to_string();
        let tokenizer = tokenizer.into_any().downcast::<OnnxTokenizer>().map_err(|_| {
            PluginError::Configuration(format!("tokenizer '{tok_id}' was not loaded by onnxruntime"))
        })?;
        let model = model.into_any().downcast::<OnnxModel>().map_err(|_| {
            PluginError::Configuration(format!("model '{model_id}' was not loaded by onnxruntime"))
        })?;
        Ok(Box::new(OnnxPipeline {
            tokenizer,
            model,
            aggregation,
        }))
    }
}

fn ort_error(id: &str, what: &str, err: impl std::fmt::Display) -> PluginError {
    PluginError::Configuration(format!("cannot {what} for '{id}': {err}"))
}

/// Dense label list from a model config `id2label` table
fn id2label(config: &Value) -> Option<Vec<String>> {
    let table = config.get("id2label")?.as_object()?;
    let mut pairs: Vec<(usize, String)> = table
        .iter()
        .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_by_key(|(idx, _)| *idx);
    let mut labels = vec![String::from("O"); pairs.last()?.0 + 1];
    for (idx, label) in pairs {
        labels[idx] = label;
    }
    Some(labels)
}

pub struct OnnxTokenizer {
    id: String,
    tokenizer: Tokenizer,
}

impl NerTokenizer for OnnxTokenizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct OnnxModel {
    id: String,
    session: Mutex<Session>,
    labels: Vec<String>,
    info: ModelInfo,
}

impl NerModel for OnnxModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn label_vocabulary(&self) -> BTreeSet<String> {
        self.labels.iter().cloned().collect()
    }

    fn info(&self) -> ModelInfo {
        self.info.clone()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct OnnxPipeline {
    tokenizer: Arc<OnnxTokenizer>,
    model: Arc<OnnxModel>,
    aggregation: Aggregation,
}

impl OnnxPipeline {
    fn logits(&self, encoding: &tokenizers::Encoding) -> std::result::Result<(usize, Vec<f32>), InferenceError> {
        let seq_len = encoding.get_ids().len();
        let to_i64 = |v: &[u32]| v.iter().map(|&x| i64::from(x)).collect::<Vec<_>>();
        let array = |data: Vec<i64>| {
            Array2::from_shape_vec((1, seq_len), data)
                .map_err(|e| InferenceError::new("ShapeError", e.to_string()))
        };
        let tensor = |a: Array2<i64>| {
            Tensor::from_array(a).map_err(|e| InferenceError::new("TensorError", e.to_string()))
        };

        let input_ids = tensor(array(to_i64(encoding.get_ids()))?)?;
        let attention_mask = tensor(array(to_i64(encoding.get_attention_mask()))?)?;

        let mut session = self
            .model
            .session
            .lock()
            .map_err(|e| InferenceError::new("LockError", e.to_string()))?;

        let wants_types = self
            .model
            .info
            .model_type
            .as_deref()
            .is_some_and(|t| TOKEN_TYPE_MODELS.contains(&t));
        let run = if wants_types {
            let token_type_ids = tensor(array(vec![0i64; seq_len])?)?;
            session.run(ort::inputs![
                "input_ids" => input_ids.into_dyn(),
                "attention_mask" => attention_mask.into_dyn(),
                "token_type_ids" => token_type_ids.into_dyn(),
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids.into_dyn(),
                "attention_mask" => attention_mask.into_dyn(),
            ])
        };
        let outputs = run.map_err(|e| InferenceError::new("RuntimeError", e.to_string()))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| InferenceError::new("OutputError", "model output has no 'logits'"))?;
        let (shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("OutputError", e.to_string()))?;
        if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != seq_len {
            return Err(InferenceError::new(
                "ShapeError",
                format!("unexpected logits shape {shape:?}"),
            ));
        }
        Ok((shape[2] as usize, data.to_vec()))
    }
}

/// Maps byte offsets of `text` to character offsets
fn char_index(text: &str) -> Vec<usize> {
    let mut index = vec![0; text.len() + 1];
    let mut chars = 0;
    for (byte, ch) in text.char_indices() {
        for slot in &mut index[byte..byte + ch.len_utf8()] {
            *slot = chars;
        }
        chars += 1;
    }
    index[text.len()] = chars;
    index
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl NerPipeline for OnnxPipeline {
    fn infer(&self, text: &str) -> std::result::Result<Vec<RawSpan>, InferenceError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let encoding = self
            .tokenizer
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::new("TokenizerError", e.to_string()))?;

        let (num_labels, logits) = self.logits(&encoding)?;
        if num_labels != self.model.labels.len() {
            return Err(InferenceError::new(
                "ShapeError",
                format!(
                    "model emits {num_labels} classes, config declares {}",
                    self.model.labels.len()
                ),
            ));
        }

        let chars = char_index(text);
        let special = encoding.get_special_tokens_mask();
        let tokens: Vec<TokenScores> = encoding
            .get_offsets()
            .iter()
            .zip(encoding.get_word_ids())
            .enumerate()
            .filter(|(idx, ((start, end), _))| special[*idx] == 0 && end > start)
            .map(|(idx, ((start, end), word))| TokenScores {
                start: chars[(*start).min(text.len())],
                end: chars[(*end).min(text.len())],
                word: *word,
                probs: softmax(&logits[idx * num_labels..(idx + 1) * num_labels]),
            })
            .collect();

        Ok(aggregate(&tokens, &self.model.labels, self.aggregation))
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id2label_dense() {
        let config = json!({"id2label": {"0": "O", "2": "I-PER", "1": "B-PER"}});
        assert_eq!(id2label(&config).unwrap(), vec!["O", "B-PER", "I-PER"]);
        assert!(id2label(&json!({})).is_none());
    }

    #[test]
    fn test_char_index_multibyte() {
        let index = char_index("Añb");
        assert_eq!(index[0], 0);
        assert_eq!(index[1], 1);
        assert_eq!(index[3], 2);
        assert_eq!(index[4], 3);
    }

    #[test]
    fn test_unsupported_params() {
        let params: BTreeMap<String, Value> = serde_json::from_value(json!({
            "revision": "v2",
            "local_files_only": true,
            "trust_remote_code": false
        }))
        .unwrap();
        let keys: Vec<&str> = unsupported_params(&params).collect();
        assert_eq!(keys, vec!["local_files_only", "trust_remote_code"]);
    }

    #[test]
    fn test_version_matches_manifest() {
        let manifest: toml::Value = toml::from_str(include_str!("../../../Cargo.toml")).unwrap();
        let pinned = manifest["dependencies"]["ort"]["version"].as_str().unwrap();
        assert_eq!(pinned, ORT_VERSION);
        assert_eq!(OnnxRuntime::new().version(), format!("ort {ORT_VERSION}"));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1]);
    }
}
