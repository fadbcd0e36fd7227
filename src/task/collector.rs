//! Task collector: assembles the plugin's task descriptor
//!
//! The plugin always yields a single multi-entity task. Its descriptor
//! carries the filtered PII descriptors and everything needed to build a
//! [`DetectionTask`] later.

use crate::adapters::ner::{default_runtime, NerRuntime};
use crate::config::{PiiDescriptor, PluginConfig, TaskConfig};
use crate::domain::{LangCode, PiiTask, Result};
use crate::task::detector::DetectionTask;
use crate::task::entity_map::filter_descriptors;
use crate::task::pipeline::EngineCache;
use crate::task::registry::package_languages;
use crate::task::{TASK_CLASS, TASK_DESCRIPTION, TASK_SOURCE};
use crate::VERSION;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Constructor turning a descriptor's PII list and arguments into a task
pub type TaskConstructor = fn(&[PiiDescriptor], &TaskKwargs) -> Result<Box<dyn PiiTask>>;

/// Arguments for building the detection task
#[derive(Clone)]
pub struct TaskKwargs {
    /// The `task_config` section
    pub cfg: TaskConfig,
    /// Languages to instantiate models for (empty = all)
    pub model_lang: BTreeSet<LangCode>,
    /// Inference runtime; the default runtime when not set
    pub runtime: Option<Arc<dyn NerRuntime>>,
    pub cache: Arc<EngineCache>,
}

impl fmt::Debug for TaskKwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskKwargs")
            .field("cfg", &self.cfg)
            .field("model_lang", &self.model_lang)
            .field("runtime", &self.runtime.as_ref().map(|r| r.name().to_string()))
            .finish_non_exhaustive()
    }
}

/// Raw task descriptor, as handed to the host framework
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub class: String,
    pub source: String,
    pub version: String,
    pub doc: String,
    pub pii: Vec<PiiDescriptor>,
    pub task: TaskConstructor,
    pub kwargs: TaskKwargs,
}

impl TaskDescriptor {
    /// Instantiates the task
    ///
    /// # Errors
    ///
    /// Propagates any task construction error
    pub fn build(&self) -> Result<Box<dyn PiiTask>> {
        (self.task)(&self.pii, &self.kwargs)
    }
}

/// Builds a [`DetectionTask`] from a descriptor
fn build_detection_task(pii: &[PiiDescriptor], kwargs: &TaskKwargs) -> Result<Box<dyn PiiTask>> {
    let runtime = match &kwargs.runtime {
        Some(runtime) => Arc::clone(runtime),
        None => default_runtime()?,
    };
    let task = DetectionTask::new(
        pii,
        &kwargs.cfg,
        &kwargs.model_lang,
        runtime.as_ref(),
        &kwargs.cache,
    )?;
    Ok(Box::new(task))
}

/// Produces the plugin task descriptor from the plugin configuration
pub struct TaskCollector {
    cfg: PluginConfig,
    model_lang: BTreeSet<LangCode>,
    runtime: Option<Arc<dyn NerRuntime>>,
    cache: Arc<EngineCache>,
}

impl TaskCollector {
    /// Creates the collector
    ///
    /// `languages` restricts the task to a subset of the configured model
    /// languages.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a model has no language
    pub fn new(cfg: PluginConfig, languages: Option<&[LangCode]>) -> Result<Self> {
        let mut model_lang = package_languages(&cfg.task_config)?;
        if let Some(languages) = languages {
            model_lang.retain(|l| languages.contains(l));
        }
        tracing::debug!(
            lang = ?model_lang.iter().map(LangCode::as_str).collect::<Vec<_>>(),
            "NER task collector initialized"
        );
        Ok(Self {
            cfg,
            model_lang,
            runtime: None,
            cache: EngineCache::global(),
        })
    }

    /// Uses the given runtime instead of the default one
    pub fn with_runtime(mut self, runtime: Arc<dyn NerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Uses the given engine cache instead of the process-wide one
    pub fn with_cache(mut self, cache: Arc<EngineCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Languages the collected task will cover
    pub fn model_lang(&self) -> &BTreeSet<LangCode> {
        &self.model_lang
    }

    /// Returns the task descriptors (always exactly one)
    ///
    /// `lang` further restricts the languages of the task.
    pub fn gather_tasks(&self, lang: Option<&[LangCode]>) -> Vec<TaskDescriptor> {
        let mut task_lang = self.model_lang.clone();
        if let Some(lang) = lang.filter(|l| !l.is_empty()) {
            task_lang.retain(|l| lang.contains(l));
        }
        tracing::debug!(
            lang = ?task_lang.iter().map(LangCode::as_str).collect::<Vec<_>>(),
            "Gathering NER plugin tasks"
        );

        vec![TaskDescriptor {
            class: TASK_CLASS.to_string(),
            source: TASK_SOURCE.to_string(),
            version: VERSION.to_string(),
            doc: TASK_DESCRIPTION.to_string(),
            pii: filter_descriptors(&self.cfg.pii_list, &task_lang),
            task: build_detection_task,
            kwargs: TaskKwargs {
                cfg: self.cfg.task_config.clone(),
                model_lang: task_lang,
                runtime: self.runtime.clone(),
                cache: Arc::clone(&self.cache),
            },
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ner::testing::MockRuntime;
    use serde_json::json;

    fn lang(code: &str) -> LangCode {
        LangCode::new(code).unwrap()
    }

    fn plugin_config() -> PluginConfig {
        serde_json::from_value(json!({
            "pii_list": [
                {"type": "PERSON", "lang": ["en", "es"], "extra": {"map": "PER"}},
                {"type": "LOCATION", "lang": ["en", "es"], "extra": {"map": "LOC"}},
                {"type": "ORG", "lang": "fr", "extra": {"map": "ORG"}}
            ],
            "task_config": {
                "cachedir": false,
                "models": [
                    {"lang_code": "en", "model": "model-en"},
                    {"lang_code": "es", "model": "model-es"}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_single_descriptor() {
        let collector = TaskCollector::new(plugin_config(), None).unwrap();
        let tasks = collector.gather_tasks(None);
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task.class, "PiiTask");
        assert_eq!(task.source, TASK_SOURCE);
        assert_eq!(task.version, VERSION);
        // ORG is only defined for a language without model
        assert_eq!(task.pii.len(), 2);
        assert_eq!(task.kwargs.model_lang.len(), 2);
    }

    #[test]
    fn test_language_restriction() {
        let collector = TaskCollector::new(plugin_config(), Some(&[lang("es"), lang("pt")])).unwrap();
        assert_eq!(collector.model_lang().len(), 1);

        let tasks = collector.gather_tasks(Some(&[lang("en")]));
        assert!(tasks[0].kwargs.model_lang.is_empty());
    }

    #[test]
    fn test_build_with_injected_runtime() {
        let runtime = Arc::new(MockRuntime::new(&["O", "B-PER", "B-LOC"]));
        let cache = Arc::new(EngineCache::new());
        let collector = TaskCollector::new(plugin_config(), None)
            .unwrap()
            .with_runtime(runtime.clone())
            .with_cache(cache.clone());

        let task = collector.gather_tasks(Some(&[lang("en")]))[0].build().unwrap();
        assert_eq!(task.to_string(), "<NER wrapper #2>");
        assert_eq!(cache.len(), 1);

        // Gathering again does not touch the cache
        collector.gather_tasks(None);
        assert_eq!(cache.len(), 1);
        assert_eq!(runtime.loads(), 1);
    }
}
