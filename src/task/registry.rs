//! Languages served by the configured models

use crate::config::TaskConfig;
use crate::domain::{LangCode, PluginError, Result};
use std::collections::BTreeSet;

/// Returns the set of languages for which a model is configured
///
/// # Errors
///
/// Returns a configuration error if a model entry has no `lang_code`
pub fn package_languages(config: &TaskConfig) -> Result<BTreeSet<LangCode>> {
    config
        .models
        .iter()
        .map(|m| {
            m.lang_code.clone().ok_or_else(|| {
                PluginError::Configuration(format!(
                    "missing 'lang_code' in NER plugin model config for '{}'",
                    m.model
                ))
            })
        })
        .collect()
}
