//! The NER detection task
//!
//! One task covers every configured language: it owns the entity map and a
//! pipeline per language, and routes each chunk by its language.

use crate::adapters::ner::{ner_labels, NerPipeline, NerRuntime};
use crate::config::{PiiDescriptor, TaskConfig};
use crate::domain::{
    DocumentChunk, LangCode, PiiEntity, PiiInfo, PiiTask, PluginError, ProcessInfo, Result,
    TaskInfo,
};
use crate::log_detection;
use crate::task::cachedir::prepare_cachedir;
use crate::task::entity_map::EntityMap;
use crate::task::pipeline::{create_pipelines, EngineCache};
use crate::task::{DEFAULT_METHOD, TASK_NAME, TASK_SOURCE};
use crate::VERSION;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// PII detection over token-classification models
pub struct DetectionTask {
    entity_map: EntityMap,
    default_lang: Option<LangCode>,
    pipelines: BTreeMap<LangCode, Box<dyn NerPipeline>>,
}

impl DetectionTask {
    /// Builds the task
    ///
    /// Steps, in order: entity map for `pii` restricted to `model_lang`
    /// (empty = no restriction), default language, model cache directory,
    /// pipelines for the mapped languages, label validation.
    ///
    /// # Errors
    ///
    /// - configuration error for invalid descriptors, models without a
    ///   language, or native labels the models do not produce
    ///
    /// A mapped language that no model serves is not an error: it is logged
    /// and counted by the task, and chunks in that language fail in `find`.
    /// - file error if the cache directory cannot be created
    /// - missing-dependency error if no inference runtime is available
    pub fn new(
        pii: &[PiiDescriptor],
        config: &TaskConfig,
        model_lang: &BTreeSet<LangCode>,
        runtime: &dyn NerRuntime,
        cache: &EngineCache,
    ) -> Result<Self> {
        let entity_map = EntityMap::build(pii, model_lang)?;
        let default_lang = entity_map.sole_language().cloned();
        tracing::info!(
            version = VERSION,
            pii = pii.len(),
            lang = ?default_lang.as_ref().map(LangCode::as_str),
            "Building NER detection task"
        );

        let managed = config.cachedir.as_ref().map_or(true, |c| c.is_managed());
        if managed {
            let explicit = config.cachedir.as_ref().and_then(|c| c.path());
            prepare_cachedir(explicit.map(|p| p.as_path()))?;
        }

        let languages = entity_map.languages();
        let pipelines = Self::create_and_validate(&entity_map, &languages, config, runtime, cache)
            .map_err(|e| match e {
                PluginError::Configuration(_) | PluginError::MissingDependency(_) => e,
                other => PluginError::Configuration(format!(
                    "cannot create NER pipeline: {}",
                    other.message()
                )),
            })?;

        Ok(Self {
            entity_map,
            default_lang,
            pipelines,
        })
    }

    fn create_and_validate(
        entity_map: &EntityMap,
        languages: &BTreeSet<LangCode>,
        config: &TaskConfig,
        runtime: &dyn NerRuntime,
        cache: &EngineCache,
    ) -> Result<BTreeMap<LangCode, Box<dyn NerPipeline>>> {
        let pipelines = if languages.is_empty() {
            BTreeMap::new()
        } else {
            create_pipelines(config, Some(languages), runtime, cache)?
        };

        for lang in languages.iter().filter(|l| !pipelines.contains_key(*l)) {
            tracing::warn!(lang = %lang, "No NER model configured for mapped language");
        }

        let mut missing = Vec::new();
        for (lang, pipeline) in &pipelines {
            let produced = ner_labels(pipeline.as_ref());
            let absent: Vec<&str> = entity_map
                .get(lang)
                .into_iter()
                .flat_map(|labels| labels.keys())
                .filter(|label| !produced.contains(*label))
                .map(String::as_str)
                .collect();
            if !absent.is_empty() {
                missing.push(format!("{{{}}} in model {}", absent.join(", "), lang));
            }
        }
        if !missing.is_empty() {
            return Err(PluginError::Configuration(format!(
                "entity not found: {}",
                missing.join("; ")
            )));
        }

        Ok(pipelines)
    }

    /// The language used for chunks without one, if the task has a single language
    pub fn default_language(&self) -> Option<&LangCode> {
        self.default_lang.as_ref()
    }

    /// Languages the task can process
    pub fn languages(&self) -> BTreeSet<LangCode> {
        self.entity_map.languages()
    }

    pub fn entity_map(&self) -> &EntityMap {
        &self.entity_map
    }

    /// The pipeline serving a language
    pub fn pipeline(&self, lang: &LangCode) -> Option<&dyn NerPipeline> {
        self.pipelines.get(lang).map(|p| p.as_ref())
    }
}

impl PiiTask for DetectionTask {
    /// Runs the language's pipeline over the chunk
    ///
    /// Spans are visited by start offset, keeping the pipeline order for
    /// equal starts. Values are trimmed and `start` moves past the leading
    /// whitespace. A span covering only whitespace yields no entity instead
    /// of an empty value.
    fn find(&self, chunk: &DocumentChunk) -> Result<Vec<PiiEntity>> {
        let lang = chunk
            .lang()
            .or(self.default_lang.as_ref())
            .ok_or_else(|| {
                PluginError::Processing("no language defined in task or document chunk".to_string())
            })?;
        let labels = self
            .entity_map
            .get(lang)
            .ok_or_else(|| PluginError::Processing(format!("no tasks for lang: {lang}")))?;
        let pipeline = self
            .pipelines
            .get(lang)
            .ok_or_else(|| PluginError::Processing(format!("no NER pipeline for lang: {lang}")))?;

        let mut spans = pipeline
            .infer(&chunk.data)
            .map_err(|e| PluginError::Processing(format!("NER exception: {e}")))?;
        tracing::trace!(chunk_id = %chunk.id, ?spans, "NER raw results");
        spans.sort_by_key(|s| s.start);

        let mut entities = Vec::with_capacity(spans.len());
        for span in &spans {
            let label = span.entity_group.as_deref().ok_or_else(|| {
                PluginError::Processing(format!(
                    "invalid aggregation in NER model: no entity_group in result: {span:?}"
                ))
            })?;
            let Some(identity) = labels.get(label) else {
                continue;
            };

            let raw: String = chunk
                .data
                .chars()
                .skip(span.start)
                .take(span.end.saturating_sub(span.start))
                .collect();
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            let shift = raw.chars().count() - raw.trim_start().chars().count();

            entities.push(PiiEntity::new(
                identity.clone(),
                value,
                chunk.id.clone(),
                span.start + shift,
                ProcessInfo::detection(span.score),
            ));
        }

        log_detection!(chunk.id, lang, spans.len(), entities.len());
        Ok(entities)
    }

    fn task_info(&self) -> TaskInfo {
        TaskInfo {
            source: TASK_SOURCE.to_string(),
            name: TASK_NAME.to_string(),
            version: VERSION.to_string(),
            method: DEFAULT_METHOD.to_string(),
        }
    }

    fn pii_info(&self) -> Vec<PiiInfo> {
        self.entity_map.pii_info().to_vec()
    }

    fn len(&self) -> usize {
        self.entity_map.len()
    }
}

impl fmt::Display for DetectionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} #{}>", TASK_NAME, self.len())
    }
}

impl fmt::Debug for DetectionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionTask")
            .field("entity_map", &self.entity_map)
            .field("default_lang", &self.default_lang)
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .finish()
    }
}
