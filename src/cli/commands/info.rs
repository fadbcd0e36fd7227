//! Info command implementation
//!
//! This module implements the `info` command, reporting component versions,
//! the configured models, their label vocabularies and the PII entities the
//! plugin task detects.

use super::run_blocking;
use crate::adapters::ner::{default_runtime, ner_labels, NerPipeline};
use crate::config::load_plugin_config;
use crate::domain::{LangCode, PiiInfo, PluginError};
use crate::plugin::PluginLoader;
use crate::task::cachedir::prepare_cachedir;
use crate::task::{create_pipelines, EngineCache};
use crate::VERSION;
use clap::{Args, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// What to report
    #[command(subcommand)]
    pub topic: InfoTopic,

    /// Languages to select
    #[arg(long, num_args = 1.., global = true)]
    pub lang: Vec<LangCode>,
}

/// Info topics
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum InfoTopic {
    /// Show version information for components
    Version,
    /// Information about the configured models
    Models,
    /// Entity labels defined in the models
    ModelEntities,
    /// PII entities defined via the plugin
    PiiEntities,
}

type Pipelines = BTreeMap<LangCode, Box<dyn NerPipeline>>;

impl InfoArgs {
    /// Execute the info command
    pub async fn execute(&self, config_files: &[PathBuf]) -> anyhow::Result<i32> {
        match self.topic {
            InfoTopic::Version => print_versions(),
            InfoTopic::Models => {
                println!(". Available pipelines (lang={})", self.lang_label());
                for (lang, pipeline) in self.pipelines(config_files).await? {
                    let info = pipeline.model_info();
                    println!("{lang}:   {}", info.class_name);
                    println!("{:>10}: {}", "type", info.model_type.unwrap_or_default());
                    println!("{:>10}: {}", "name", info.name_or_path);
                }
            }
            InfoTopic::ModelEntities => {
                println!(". Labels defined in models (lang={})", self.lang_label());
                for (lang, pipeline) in self.pipelines(config_files).await? {
                    let labels: Vec<String> = ner_labels(pipeline.as_ref()).into_iter().collect();
                    println!("{lang}: {}", labels.join(", "));
                }
            }
            InfoTopic::PiiEntities => {
                println!(
                    ". PII entities defined from plugin models (lang={})",
                    self.lang_label()
                );
                for info in self.pii_entities(config_files).await? {
                    let name = info.identity.to_string();
                    let lang = info
                        .identity
                        .lang
                        .as_ref()
                        .map(LangCode::as_str)
                        .unwrap_or_default();
                    println!("  {name:40} {lang:5} {}", info.method);
                }
            }
        }
        Ok(0)
    }

    fn lang_label(&self) -> String {
        if self.lang.is_empty() {
            "all".to_string()
        } else {
            self.lang
                .iter()
                .map(LangCode::as_str)
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    async fn pipelines(&self, config_files: &[PathBuf]) -> anyhow::Result<Pipelines> {
        let files = config_files.to_vec();
        let langs: BTreeSet<LangCode> = self.lang.iter().cloned().collect();
        let pipelines = run_blocking("pipeline creation", move || {
            let config = load_plugin_config(&files)?;
            let task_config = config.task_config;
            if let Some(setting) = task_config.cachedir.as_ref().filter(|c| !c.is_managed()) {
                tracing::debug!(?setting, "Model cache directory left unmanaged");
            } else {
                let explicit = task_config.cachedir.as_ref().and_then(|c| c.path());
                prepare_cachedir(explicit.map(|p| p.as_path()))?;
            }
            let runtime = default_runtime()?;
            create_pipelines(&task_config, Some(&langs), runtime.as_ref(), &EngineCache::global())
                .map_err(|e| match e {
                    PluginError::MissingDependency(_) => e,
                    other => PluginError::Processing(format!(
                        "cannot create NER pipelines: {}",
                        other.message()
                    )),
                })
        })
        .await?;
        Ok(pipelines)
    }

    async fn pii_entities(&self, config_files: &[PathBuf]) -> anyhow::Result<Vec<PiiInfo>> {
        let files = config_files.to_vec();
        let langs = self.lang.clone();
        let info = run_blocking("task construction", move || {
            let restrict = (!langs.is_empty()).then_some(langs.as_slice());
            let loader = PluginLoader::new(&files, restrict)?;
            let mut info = Vec::new();
            for descriptor in loader.get_plugin_tasks(None) {
                let task = descriptor.build()?;
                info.extend(task.pii_info());
            }
            Ok(info)
        })
        .await?;
        Ok(info)
    }
}

fn runtime_version() -> String {
    match default_runtime() {
        Ok(runtime) => format!("{} {}", runtime.name(), runtime.version()),
        Err(e) => format!("not available ({})", e.message()),
    }
}

fn print_versions() {
    println!(". Installed package versions");
    println!("{:>25}: {}", "PII NER plugin", VERSION);
    println!("{:>25}: {}", "Inference runtime", runtime_version());
}
