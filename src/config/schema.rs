//! Configuration schema types
//!
//! The plugin configuration has two sections: `pii_list`, the PII descriptors
//! the plugin can detect, and `task_config`, the settings of the models that
//! detect them.

use crate::config::SecretString;
use crate::domain::{LangCode, PiiType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Format tag a configuration document may declare
pub const FMT_CONFIG: &str = "pii-ner:main:v1";

/// Name of the config section listing the PII instances to be detected
pub const CFG_MAP: &str = "pii_list";

/// Name of the config section holding the task settings
pub const CFG_TASK: &str = "task_config";

/// Root plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// PII descriptors, in configuration order
    #[serde(default)]
    pub pii_list: Vec<PiiDescriptor>,

    /// Model and engine settings
    #[serde(default)]
    pub task_config: TaskConfig,
}

impl PluginConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.task_config.validate()
    }
}

/// Languages a descriptor applies to: a single code or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LangSpec {
    One(LangCode),
    Many(Vec<LangCode>),
}

impl LangSpec {
    /// The languages as a set
    pub fn languages(&self) -> BTreeSet<LangCode> {
        match self {
            Self::One(lang) => BTreeSet::from([lang.clone()]),
            Self::Many(langs) => langs.iter().cloned().collect(),
        }
    }
}

/// Where a descriptor's model-native label comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeLabelSource {
    /// The same label for every language of the descriptor
    Uniform(String),
    /// A different label per language
    PerLanguage(BTreeMap<LangCode, String>),
}

impl NativeLabelSource {
    /// Native label for a language, if defined
    pub fn label_for(&self, lang: &LangCode) -> Option<&str> {
        match self {
            Self::Uniform(label) => Some(label),
            Self::PerLanguage(map) => map.get(lang).map(String::as_str),
        }
    }
}

/// Plugin-specific descriptor fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorExtra {
    #[serde(default)]
    pub map: Option<NativeLabelSource>,
}

/// A PII descriptor: one detectable PII type and how models name it
///
/// A descriptor without `lang` is a removal marker for any earlier
/// descriptor sharing its `(type, subtype)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiDescriptor {
    #[serde(rename = "type")]
    pub pii: PiiType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default)]
    pub lang: Option<LangSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Detection method reported for this entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default)]
    pub extra: DescriptorExtra,
}

impl PiiDescriptor {
    /// Layering key: `type/subtype`
    pub fn key(&self) -> String {
        match &self.subtype {
            Some(subtype) => format!("{}/{}", self.pii, subtype),
            None => format!("{}/None", self.pii),
        }
    }

    /// Languages of the descriptor (empty for removal markers)
    pub fn languages(&self) -> BTreeSet<LangCode> {
        self.lang.as_ref().map(LangSpec::languages).unwrap_or_default()
    }

    pub fn is_removal(&self) -> bool {
        self.lang.is_none()
    }
}

/// Policy for merging sub-word model outputs into entity-level spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Per-token output, no grouping
    None,
    /// Group adjacent tokens sharing a label
    Simple,
    /// Word label from its first token
    First,
    /// Word label from the averaged token scores
    Average,
    /// Word label from its highest-scoring token
    #[default]
    Max,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::First => "first",
            Self::Average => "average",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "simple" => Ok(Self::Simple),
            "first" => Ok(Self::First),
            "average" => Ok(Self::Average),
            "max" => Ok(Self::Max),
            _ => Err(format!(
                "Invalid aggregation '{s}'. Must be one of: none, simple, first, average, max"
            )),
        }
    }
}

/// Cache directory setting: a path, or a flag (`false` = leave it alone)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheDirSetting {
    Flag(bool),
    Path(PathBuf),
}

impl CacheDirSetting {
    /// Whether the plugin should manage the cache directory at all
    pub fn is_managed(&self) -> bool {
        !matches!(self, Self::Flag(false))
    }

    /// Explicitly configured path, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Path(p) if !p.as_os_str().is_empty() => Some(p),
            _ => None,
        }
    }
}

/// Task settings: models and engine behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// One model per language
    #[serde(default)]
    pub models: Vec<ModelSpec>,

    /// Reuse loaded tokenizer/model pairs across task constructions
    #[serde(default = "default_reuse_engine")]
    pub reuse_engine: bool,

    /// Default aggregation strategy
    #[serde(default)]
    pub aggregation: Aggregation,

    /// Model weight cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cachedir: Option<CacheDirSetting>,

    /// Access token for gated model repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<SecretString>,
}

fn default_reuse_engine() -> bool {
    true
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            reuse_engine: default_reuse_engine(),
            aggregation: Aggregation::default(),
            cachedir: None,
            hf_token: None,
        }
    }
}

impl TaskConfig {
    fn validate(&self) -> Result<(), String> {
        for (idx, model) in self.models.iter().enumerate() {
            if model.model.trim().is_empty() {
                return Err(format!("models[{idx}]: model name cannot be empty"));
            }
            if let Some(tokenizer) = &model.tokenizer {
                if tokenizer.trim().is_empty() {
                    return Err(format!("models[{idx}]: tokenizer name cannot be empty"));
                }
            }
        }
        Ok(())
    }
}

/// Configuration of one language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Language served by this model (required, checked by the registry)
    #[serde(default)]
    pub lang_code: Option<LangCode>,

    /// Model identifier
    pub model: String,

    /// Tokenizer identifier, defaults to the model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,

    /// Extra model loading parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub model_params: BTreeMap<String, Value>,

    /// Aggregation override for this model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

impl ModelSpec {
    pub fn tokenizer_id(&self) -> &str {
        self.tokenizer
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.model)
    }

    /// Pipeline cache key: `tokenizer/model[/k1=v1-k2=v2...]`, params sorted
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}/{}", self.tokenizer_id(), self.model);
        if !self.model_params.is_empty() {
            let params: Vec<String> = self
                .model_params
                .iter()
                .map(|(k, v)| format!("{k}={}", param_value(v)))
                .collect();
            key.push('/');
            key.push_str(&params.join("-"));
        }
        key
    }

    /// Effective aggregation strategy given the task-level default
    pub fn aggregation_or(&self, default: Aggregation) -> Aggregation {
        self.aggregation.unwrap_or(default)
    }
}

/// Renders a parameter value the way it appears in cache keys
pub fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
