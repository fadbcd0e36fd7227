//! The NER detection task and its building blocks
//!
//! - [`registry`] - languages served by the configured models
//! - [`entity_map`] - native label to canonical PII identity, per language
//! - [`pipeline`] - engine cache and pipeline factory
//! - [`cachedir`] - model weight cache directory
//! - [`detector`] - the detection task
//! - [`collector`] - the task descriptor handed to the host framework

pub mod cachedir;
pub mod collector;
pub mod detector;
pub mod entity_map;
pub mod pipeline;
pub mod registry;

pub use collector::{TaskCollector, TaskConstructor, TaskDescriptor, TaskKwargs};
pub use detector::DetectionTask;
pub use entity_map::{filter_descriptors, EntityMap};
pub use pipeline::{create_pipelines, CachedEngine, EngineCache};
pub use registry::package_languages;

/// Source identifier of the task
pub const TASK_SOURCE: &str = "piisa:pii-ner";

/// Task description
pub const TASK_DESCRIPTION: &str = "NER model based PII tasks for some languages";

/// Task name, also used in its textual form
pub const TASK_NAME: &str = "NER wrapper";

/// Task class in the descriptor
pub const TASK_CLASS: &str = "PiiTask";

/// Detection method reported when a descriptor does not name one
pub const DEFAULT_METHOD: &str = "ner-model";
