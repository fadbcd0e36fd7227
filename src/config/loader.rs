//! Configuration loader with layering and environment variable overrides
//!
//! The effective configuration is built from the embedded defaults followed by
//! any number of user documents, in order:
//! - `pii_list` entries are appended, so a later document can drop an
//!   earlier entry with a `lang: null` descriptor for the same type/subtype
//! - `task_config` keys overlay the keys of earlier documents

use super::schema::{
    Aggregation, CacheDirSetting, PiiDescriptor, PluginConfig, TaskConfig, CFG_MAP, CFG_TASK,
    FMT_CONFIG,
};
use super::secret::secret_string;
use crate::domain::errors::PluginError;
use crate::domain::result::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Built-in plugin configuration
const DEFAULT_CONFIG: &str = include_str!("../../resources/plugin-config.json");

/// Loads the plugin configuration: defaults plus the given files, in order
///
/// This function:
/// 1. Reads each file (JSON, or TOML when the extension is `.toml`)
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Layers the documents over the built-in defaults
/// 4. Applies environment variable overrides (PII_NER_* prefix)
/// 5. Validates the configuration
///
/// # Examples
///
/// ```no_run
/// use pii_ner::config::load_plugin_config;
///
/// let config = load_plugin_config(&["custom.json"]).expect("Failed to load config");
/// ```
pub fn load_plugin_config<P: AsRef<Path>>(files: &[P]) -> Result<PluginConfig> {
    let mut docs = Vec::with_capacity(files.len());
    for file in files {
        docs.push(read_config_document(file.as_ref())?);
    }
    load_plugin_config_from_values(docs)
}

/// Same as [`load_plugin_config`], with already parsed documents
pub fn load_plugin_config_from_values<I>(docs: I) -> Result<PluginConfig>
where
    I: IntoIterator<Item = Value>,
{
    let defaults: Value = serde_json::from_str(DEFAULT_CONFIG).map_err(|e| {
        PluginError::Configuration(format!("invalid built-in configuration: {e}"))
    })?;

    let mut config = merge_documents(std::iter::once(defaults).chain(docs))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PluginError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    tracing::debug!(
        pii = config.pii_list.len(),
        models = config.task_config.models.len(),
        "Plugin configuration loaded"
    );
    Ok(config)
}

/// Reads and parses one configuration file
pub fn read_config_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(PluginError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PluginError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        let value: toml::Value = toml::from_str(&contents)?;
        serde_json::to_value(value).map_err(|e| {
            PluginError::Configuration(format!("Failed to convert {}: {}", path.display(), e))
        })
    } else {
        serde_json::from_str(&contents).map_err(|e| {
            PluginError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Layers configuration documents into a single configuration
fn merge_documents<I>(docs: I) -> Result<PluginConfig>
where
    I: IntoIterator<Item = Value>,
{
    let mut pii_list: Vec<PiiDescriptor> = Vec::new();
    let mut task_config = Map::new();

    for doc in docs {
        let Value::Object(mut doc) = doc else {
            return Err(PluginError::Configuration(
                "configuration document must be an object".to_string(),
            ));
        };

        if let Some(format) = doc.remove("format") {
            if format.as_str() != Some(FMT_CONFIG) {
                return Err(PluginError::Configuration(format!(
                    "unsupported configuration format {format}, expected '{FMT_CONFIG}'"
                )));
            }
        }

        match doc.remove(CFG_MAP) {
            Some(Value::Array(entries)) => {
                for (idx, entry) in entries.into_iter().enumerate() {
                    let descriptor: PiiDescriptor =
                        serde_json::from_value(entry).map_err(|e| {
                            PluginError::Configuration(format!(
                                "invalid PII descriptor {CFG_MAP}[{idx}]: {e}"
                            ))
                        })?;
                    pii_list.push(descriptor);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(PluginError::Configuration(format!(
                    "config field '{CFG_MAP}' must be a list"
                )))
            }
        }

        match doc.remove(CFG_TASK) {
            Some(Value::Object(section)) => task_config.extend(section),
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(PluginError::Configuration(format!(
                    "config field '{CFG_TASK}' must be an object"
                )))
            }
        }
    }

    let task_config: TaskConfig = serde_json::from_value(Value::Object(task_config))
        .map_err(|e| PluginError::Configuration(format!("invalid '{CFG_TASK}': {e}")))?;

    Ok(PluginConfig {
        pii_list,
        task_config,
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PluginError::Configuration(format!("invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        // Don't process env vars in (TOML) comments
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PluginError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the PII_NER_* prefix
fn apply_env_overrides(config: &mut PluginConfig) -> Result<()> {
    let task = &mut config.task_config;

    if let Ok(val) = std::env::var("PII_NER_TASK_REUSE_ENGINE") {
        task.reuse_engine = val.parse().map_err(|_| {
            PluginError::Configuration(format!("Invalid PII_NER_TASK_REUSE_ENGINE value: {val}"))
        })?;
    }
    if let Ok(val) = std::env::var("PII_NER_TASK_AGGREGATION") {
        task.aggregation = val
            .parse::<Aggregation>()
            .map_err(PluginError::Configuration)?;
    }
    if let Ok(val) = std::env::var("PII_NER_TASK_CACHEDIR") {
        task.cachedir = Some(match val.as_str() {
            "false" => CacheDirSetting::Flag(false),
            _ => CacheDirSetting::Path(PathBuf::from(val)),
        });
    }
    if let Ok(val) = std::env::var("PII_NER_HF_TOKEN") {
        if !val.is_empty() {
            task.hf_token = Some(secret_string(val));
        }
    }

    Ok(())
}
