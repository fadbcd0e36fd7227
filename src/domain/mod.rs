//! Domain models and types for the plugin.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`LangCode`])
//! - **PII models** ([`PiiType`], [`EntityIdentity`], [`PiiEntity`])
//! - **Host framework contract** ([`DocumentChunk`], [`PiiTask`], [`PiiCollection`])
//! - **Error types** ([`PluginError`], [`ErrorKind`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, PluginError>`]:
//!
//! ```rust
//! use pii_ner::domain::{PluginError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = pii_ner::config::load_plugin_config(&[] as &[&str])?;
//!     assert!(!config.pii_list.is_empty());
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod collection;
pub mod errors;
pub mod ids;
pub mod pii;
pub mod result;
pub mod task;

// Re-export commonly used types for convenience
pub use chunk::{ChunkContext, DocumentChunk};
pub use collection::{annotate, DetectorInfo, PiiCollection};
pub use errors::{ErrorKind, PluginError};
pub use ids::LangCode;
pub use pii::{EntityIdentity, PiiEntity, PiiRecord, PiiType, ProcessInfo};
pub use result::Result;
pub use task::{PiiInfo, PiiTask, TaskInfo};
