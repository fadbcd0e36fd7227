//! Plugin entry point
//!
//! The host framework instantiates a [`PluginLoader`] and asks it for task
//! descriptors.
//!
//! ```rust,no_run
//! use pii_ner::plugin::PluginLoader;
//!
//! # fn example() -> pii_ner::domain::Result<()> {
//! let loader = PluginLoader::new(&["custom.json"], None)?;
//! for descriptor in loader.get_plugin_tasks(None) {
//!     let task = descriptor.build()?;
//!     println!("{task}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::adapters::ner::NerRuntime;
use crate::config::{load_plugin_config, PluginConfig};
use crate::domain::{LangCode, Result};
use crate::task::{EngineCache, TaskCollector, TaskDescriptor, TASK_DESCRIPTION, TASK_SOURCE};
use crate::VERSION;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Entry point of the plugin
pub struct PluginLoader {
    cfg: PluginConfig,
    collector: TaskCollector,
}

impl PluginLoader {
    pub const SOURCE: &'static str = TASK_SOURCE;
    pub const VERSION: &'static str = VERSION;
    pub const DESCRIPTION: &'static str = TASK_DESCRIPTION;

    /// Loads the configuration (defaults plus `config_files`) and prepares
    /// the task collector, optionally restricted to `languages`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid
    pub fn new<P: AsRef<Path>>(config_files: &[P], languages: Option<&[LangCode]>) -> Result<Self> {
        let cfg = load_plugin_config(config_files)?;
        Self::from_config(cfg, languages)
    }

    /// Same as [`PluginLoader::new`], with an already loaded configuration
    pub fn from_config(cfg: PluginConfig, languages: Option<&[LangCode]>) -> Result<Self> {
        let collector = TaskCollector::new(cfg.clone(), languages)?;
        Ok(Self { cfg, collector })
    }

    /// Uses the given inference runtime for the tasks it produces
    pub fn with_runtime(mut self, runtime: Arc<dyn NerRuntime>) -> Self {
        self.collector = self.collector.with_runtime(runtime);
        self
    }

    /// Uses the given engine cache for the tasks it produces
    pub fn with_cache(mut self, cache: Arc<EngineCache>) -> Self {
        self.collector = self.collector.with_cache(cache);
        self
    }

    /// The effective plugin configuration
    pub fn config(&self) -> &PluginConfig {
        &self.cfg
    }

    /// Returns the task descriptors, optionally restricted to `lang`
    pub fn get_plugin_tasks(&self, lang: Option<&[LangCode]>) -> Vec<TaskDescriptor> {
        self.collector.gather_tasks(lang)
    }
}

impl fmt::Display for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<PluginLoader: pii-ner {}>", VERSION)
    }
}
