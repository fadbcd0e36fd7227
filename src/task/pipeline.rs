//! Pipeline cache and factory
//!
//! Loaded tokenizer/model pairs are kept in an [`EngineCache`] keyed by
//! [`ModelSpec::cache_key`]. Pipelines are always rebuilt around the cached
//! pair since the aggregation strategy may differ between tasks.

use crate::adapters::ner::{LoadOptions, NerModel, NerPipeline, NerRuntime, NerTokenizer};
use crate::config::{ModelSpec, TaskConfig};
use crate::domain::{LangCode, Result};
use crate::task::registry::package_languages;
use crate::{log_engine_load, log_engine_reuse};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;

/// A loaded tokenizer/model pair
#[derive(Clone)]
pub struct CachedEngine {
    pub tokenizer: Arc<dyn NerTokenizer>,
    pub model: Arc<dyn NerModel>,
}

/// Store of loaded engines, shared by every task that holds it
///
/// Entries are only ever added; [`EngineCache::clear`] resets the store.
/// Lookup and load happen under a single lock, so two tasks racing on the
/// same key load the engine once.
#[derive(Default)]
pub struct EngineCache {
    entries: Mutex<HashMap<String, CachedEngine>>,
}

static GLOBAL_CACHE: OnceLock<Arc<EngineCache>> = OnceLock::new();

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<EngineCache> {
        GLOBAL_CACHE
            .get_or_init(|| Arc::new(EngineCache::new()))
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedEngine>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the engine stored under `key`, loading and storing it if absent
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<(CachedEngine, bool)>
    where
        F: FnOnce() -> Result<CachedEngine>,
    {
        let mut entries = self.lock();
        if let Some(engine) = entries.get(key) {
            return Ok((engine.clone(), true));
        }
        let engine = load()?;
        entries.insert(key.to_string(), engine.clone());
        Ok((engine, false))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl std::fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCache")
            .field("keys", &self.keys())
            .finish()
    }
}

fn load_engine(
    runtime: &dyn NerRuntime,
    spec: &ModelSpec,
    config: &TaskConfig,
) -> Result<CachedEngine> {
    let lang = spec
        .lang_code
        .as_ref()
        .map(LangCode::as_str)
        .unwrap_or_default();
    let options = LoadOptions {
        params: &spec.model_params,
        auth_token: config.hf_token.as_ref(),
    };

    let started = Instant::now();
    let tokenizer = runtime.load_tokenizer(spec.tokenizer_id(), &options)?;
    let model = runtime.load_model(&spec.model, &options)?;
    log_engine_load!(lang, spec.model, started.elapsed());

    Ok(CachedEngine { tokenizer, model })
}

/// Creates one pipeline per configured language
///
/// Models are restricted to `languages` when given and non-empty. With
/// `reuse_engine` set, tokenizer/model pairs come from (and go to) `cache`.
///
/// # Errors
///
/// Returns a configuration error for a model without language, and
/// propagates runtime load failures unchanged
pub fn create_pipelines(
    config: &TaskConfig,
    languages: Option<&BTreeSet<LangCode>>,
    runtime: &dyn NerRuntime,
    cache: &EngineCache,
) -> Result<BTreeMap<LangCode, Box<dyn NerPipeline>>> {
    let mut langset = package_languages(config)?;
    if let Some(requested) = languages.filter(|l| !l.is_empty()) {
        langset = langset.intersection(requested).cloned().collect();
    }

    let models: Vec<&ModelSpec> = config
        .models
        .iter()
        .filter(|m| m.lang_code.as_ref().is_some_and(|l| langset.contains(l)))
        .collect();
    tracing::debug!(
        runtime = runtime.name(),
        models = %models
            .iter()
            .filter_map(|m| m.lang_code.as_ref().map(LangCode::as_str))
            .collect::<Vec<_>>()
            .join(","),
        reuse = config.reuse_engine,
        "Instantiating NER models"
    );

    let mut pipelines = BTreeMap::new();
    for spec in models {
        let Some(lang) = spec.lang_code.clone() else {
            continue;
        };
        let aggregation = spec.aggregation_or(config.aggregation);

        let engine = if config.reuse_engine {
            let key = spec.cache_key();
            let (engine, hit) = cache.get_or_load(&key, || load_engine(runtime, spec, config))?;
            if hit {
                log_engine_reuse!(lang, key);
            }
            engine
        } else {
            load_engine(runtime, spec, config)?
        };

        let pipeline = runtime.pipeline(engine.tokenizer, engine.model, aggregation)?;
        pipelines.insert(lang, pipeline);
    }

    Ok(pipelines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ner::testing::MockRuntime;
    use crate::config::Aggregation;
    use serde_json::json;

    fn config(value: serde_json::Value) -> TaskConfig {
        serde_json::from_value(value).unwrap()
    }

    fn two_models() -> TaskConfig {
        config(json!({
            "aggregation": "simple",
            "models": [
                {"lang_code": "en", "model": "model-en"},
                {"lang_code": "es", "model": "model-es", "aggregation": "first"}
            ]
        }))
    }

    fn langs(codes: &[&str]) -> BTreeSet<LangCode> {
        codes.iter().map(|c| LangCode::new(*c).unwrap()).collect()
    }

    #[test]
    fn test_create_all_languages() {
        let runtime = MockRuntime::new(&["O", "B-PER"]);
        let cache = EngineCache::new();

        let pipelines = create_pipelines(&two_models(), None, &runtime, &cache).unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(runtime.loads(), 2);
        assert_eq!(cache.len(), 2);

        let en = &pipelines[&LangCode::new("en").unwrap()];
        let es = &pipelines[&LangCode::new("es").unwrap()];
        assert_eq!(en.aggregation(), Aggregation::Simple);
        assert_eq!(es.aggregation(), Aggregation::First);
    }

    #[test]
    fn test_restricted_languages() {
        let runtime = MockRuntime::new(&["O"]);
        let cache = EngineCache::new();

        let pipelines =
            create_pipelines(&two_models(), Some(&langs(&["es", "fr"])), &runtime, &cache).unwrap();
        assert_eq!(pipelines.keys().map(LangCode::as_str).collect::<Vec<_>>(), vec!["es"]);
        assert_eq!(runtime.loads(), 1);
    }

    #[test]
    fn test_cache_hit_skips_load() {
        let runtime = MockRuntime::new(&["O"]);
        let cache = EngineCache::new();
        let cfg = two_models();

        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        assert_eq!(runtime.loads(), 1);
        assert!(cache.contains("model-en/model-en"));

        create_pipelines(&cfg, Some(&langs(&["es"])), &runtime, &cache).unwrap();
        assert_eq!(runtime.loads(), 2);
    }

    #[test]
    fn test_no_reuse_always_loads() {
        let runtime = MockRuntime::new(&["O"]);
        let cache = EngineCache::new();
        let mut cfg = two_models();
        cfg.reuse_engine = false;

        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        assert_eq!(runtime.loads(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_forces_reload() {
        let runtime = MockRuntime::new(&["O"]);
        let cache = EngineCache::new();
        let cfg = two_models();

        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        cache.clear();
        create_pipelines(&cfg, Some(&langs(&["en"])), &runtime, &cache).unwrap();
        assert_eq!(runtime.loads(), 2);
    }

    #[test]
    fn test_model_without_language() {
        let runtime = MockRuntime::new(&["O"]);
        let cfg = config(json!({"models": [{"model": "m"}]}));
        let err = create_pipelines(&cfg, None, &runtime, &EngineCache::new())
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_global_cache_is_shared() {
        let a = EngineCache::global();
        let b = EngineCache::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
