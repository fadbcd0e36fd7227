//! Detect command implementation
//!
//! This module implements the `detect` command: build the plugin task, run
//! it over one text and print or save the detected entities.

use super::run_blocking;
use crate::domain::{
    annotate, DetectorInfo, DocumentChunk, LangCode, PiiCollection, PiiRecord, PluginError,
};
use crate::plugin::PluginLoader;
use anyhow::Context;
use clap::{ArgGroup, Args};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Arguments for the detect command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["input_data", "input_file"])))]
pub struct DetectArgs {
    /// Text to process
    #[arg(long)]
    pub input_data: Option<String>,

    /// Text file to process
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Destination file (JSON lines)
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Document language
    #[arg(long)]
    pub lang: Option<LangCode>,

    /// Also print the text with entities annotated in place
    #[arg(long)]
    pub annotate: bool,
}

impl DetectArgs {
    /// Execute the detect command
    pub async fn execute(&self, config_files: &[PathBuf]) -> anyhow::Result<i32> {
        let text = match (&self.input_data, &self.input_file) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => {
                tracing::debug!(path = %path.display(), "Loading text");
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("cannot read input file {}", path.display()))?
            }
            (None, None) => anyhow::bail!("no input given"),
        };

        let files = config_files.to_vec();
        let lang = self.lang.clone();

        let (collection, text) = run_blocking("detection", move || {
            let languages = lang.clone().map(|l| vec![l]);
            let loader = PluginLoader::new(&files, languages.as_deref())?;
            let descriptor = loader
                .get_plugin_tasks(None)
                .into_iter()
                .next()
                .ok_or_else(|| PluginError::Configuration("plugin yields no task".to_string()))?;
            let task = descriptor.build()?;
            tracing::info!(task = %task, "Task built");

            let mut chunk = DocumentChunk::new("1", text.clone());
            if let Some(lang) = lang {
                chunk = chunk.with_lang(lang);
            }
            let mut collection = PiiCollection::new(DetectorInfo::from(&task.task_info()));
            collection.extend(task.find(&chunk)?);
            Ok((collection, text))
        })
        .await?;

        tracing::info!(entities = collection.len(), "Entities detected");
        if collection.is_empty() {
            return Ok(0);
        }

        if let Some(outfile) = &self.outfile {
            save(&collection, outfile)?;
            return Ok(0);
        }

        for entity in &collection {
            print_record(&entity.to_record());
            println!();
        }
        if self.annotate {
            println!("{}", annotate(&text, &collection));
        }
        Ok(0)
    }
}

fn save(collection: &PiiCollection, outfile: &Path) -> anyhow::Result<()> {
    tracing::debug!(outfile = %outfile.display(), "Saving entities");
    let file = File::create(outfile)
        .with_context(|| format!("cannot create output file {}", outfile.display()))?;
    collection.dump_jsonl(BufWriter::new(file))?;
    Ok(())
}

fn print_record(record: &PiiRecord) {
    println!("{:>12} {}", "type", record.pii_type);
    if let Some(subtype) = &record.subtype {
        println!("{:>12} {}", "subtype", subtype);
    }
    if let Some(lang) = &record.lang {
        println!("{:>12} {}", "lang", lang);
    }
    if let Some(country) = &record.country {
        println!("{:>12} {}", "country", country);
    }
    println!("{:>12} {}", "chunkid", record.chunkid);
    println!("{:>12} {}", "value", record.value);
    println!("{:>12} {}", "start", record.start);
    println!("{:>12} {}", "end", record.end);
    println!(
        "{:>12} stage={} score={:.4}",
        "process", record.process.stage, record.process.score
    );
}
