//! Configuration management for the plugin.
//!
//! # Overview
//!
//! Configuration documents are JSON or TOML, layered over built-in defaults,
//! with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Removal of default PII entries by later documents (`"lang": null`)
//! - Environment variable overrides (`PII_NER_*`)
//!
//! # Configuration Structure
//!
//! - [`PluginConfig`] - root: `pii_list` + `task_config`
//! - [`PiiDescriptor`] - one PII type, its languages and native model label
//! - [`TaskConfig`] - engine reuse, aggregation, cache directory, models
//! - [`ModelSpec`] - model/tokenizer identifiers for one language
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "format": "pii-ner:main:v1",
//!   "pii_list": [
//!     {"type": "PERSON", "lang": ["en", "es"], "extra": {"map": "PER"}},
//!     {"type": "ORG", "lang": "en", "extra": {"map": {"en": "ORG"}}},
//!     {"type": "LOCATION", "lang": null}
//!   ],
//!   "task_config": {
//!     "reuse_engine": true,
//!     "aggregation": "max",
//!     "cachedir": "/var/cache/pii-ner",
//!     "models": [
//!       {"lang_code": "en", "model": "dslim/bert-base-NER"}
//!     ]
//!   }
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `PII_NER_TASK_REUSE_ENGINE` - `true`/`false`
//! - `PII_NER_TASK_AGGREGATION` - `none`, `simple`, `first`, `average`, `max`
//! - `PII_NER_TASK_CACHEDIR` - cache directory, or `false` to leave it unmanaged
//! - `PII_NER_HF_TOKEN` - access token for gated model repositories

pub mod loader;
pub mod logging;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_plugin_config, load_plugin_config_from_values, read_config_document};
pub use logging::LoggingConfig;
pub use schema::{
    Aggregation, CacheDirSetting, DescriptorExtra, LangSpec, ModelSpec, NativeLabelSource,
    PiiDescriptor, PluginConfig, TaskConfig, FMT_CONFIG,
};
pub use secret::{secret_string, SecretString, SecretValue};
