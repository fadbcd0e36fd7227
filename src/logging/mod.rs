//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with `RUST_LOG`-style filtering
//! - Optional JSON-formatted, rotated log files
//! - Logging macros for the recurring pipeline-lifecycle events
//!
//! # Example
//!
//! ```no_run
//! use pii_ner::logging::init_logging;
//! use pii_ner::config::LoggingConfig;
//!
//! let _guard = init_logging("info", &LoggingConfig::console()).expect("Failed to initialize logging");
//!
//! tracing::info!("Plugin started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the reuse of a cached tokenizer/model pair
///
/// # Example
///
/// ```no_run
/// use pii_ner::log_engine_reuse;
///
/// log_engine_reuse!("en", "dslim/bert-base-NER/dslim/bert-base-NER");
/// ```
#[macro_export]
macro_rules! log_engine_reuse {
    ($lang:expr, $key:expr) => {
        tracing::debug!(lang = %$lang, cache_key = %$key, "Reusing cached NER engine");
    };
}

/// Log a fresh tokenizer/model load
///
/// # Example
///
/// ```no_run
/// use pii_ner::log_engine_load;
/// use std::time::Duration;
///
/// log_engine_load!("en", "dslim/bert-base-NER", Duration::from_millis(1200));
/// ```
#[macro_export]
macro_rules! log_engine_load {
    ($lang:expr, $model:expr, $duration:expr) => {
        tracing::info!(
            lang = %$lang,
            model = %$model,
            duration_ms = $duration.as_millis() as u64,
            "Loaded NER model"
        );
    };
}

/// Log the outcome of a detection call
///
/// # Example
///
/// ```no_run
/// use pii_ner::log_detection;
///
/// log_detection!("chunk-1", "en", 5, 2);
/// ```
#[macro_export]
macro_rules! log_detection {
    ($chunk_id:expr, $lang:expr, $spans:expr, $entities:expr) => {
        tracing::debug!(
            chunk_id = %$chunk_id,
            lang = %$lang,
            spans = $spans,
            entities = $entities,
            "NER detection done"
        );
    };
}
