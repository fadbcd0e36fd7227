// pii-ner - NER-model PII detection plugin
// Copyright (c) 2025 pii-ner Contributors
// Licensed under the MIT License

//! # pii-ner - PII detection with token-classification models
//!
//! pii-ner is a detection plugin for a PII-processing framework. It runs
//! Named Entity Recognition models over document chunks and maps the model
//! labels (`PER`, `LOC`, `ORG`, ...) onto the framework's PII taxonomy.
//!
//! ## Overview
//!
//! The library provides:
//! - **Configuration** of the detectable PII types and the per-language models
//! - **Model registry** resolving the languages the configured models serve
//! - **Pipeline cache** so repeated task constructions load each model once
//! - **Detection task** turning model spans into trimmed, typed PII entities
//! - **Plugin loader** handing task descriptors to the host framework
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`plugin`] - Host framework entry point
//! - [`task`] - Registry, entity map, pipeline cache and the detection task
//! - [`adapters`] - Inference runtime seam and its ONNX implementation
//! - [`domain`] - Core domain types and the host framework contract
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pii_ner::domain::{DocumentChunk, LangCode};
//! use pii_ner::plugin::PluginLoader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = PluginLoader::new(&["plugin.json"], None)?;
//! let task = loader.get_plugin_tasks(None)[0].build()?;
//!
//! let chunk = DocumentChunk::new("1", "Alan Turing was born in London")
//!     .with_lang(LangCode::new("en")?);
//! for entity in task.find(&chunk)? {
//!     println!("{} {} @{}", entity.info.pii, entity.value, entity.start);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Inference backends
//!
//! Inference sits behind the [`adapters::ner::NerRuntime`] trait. Building
//! with the `onnx` feature enables a runtime that downloads models from the
//! Hugging Face hub and runs them with ONNX Runtime; without it, building a
//! task fails with a missing-dependency error.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod plugin;
pub mod task;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
