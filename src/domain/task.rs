//! Contract between detection tasks and the host extraction framework

use super::chunk::DocumentChunk;
use super::pii::{EntityIdentity, PiiEntity};
use super::result::Result;
use std::fmt;

/// Descriptive metadata of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub source: String,
    pub name: String,
    pub version: String,
    pub method: String,
}

/// One detectable entity as exposed by a task, plus the method detecting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiInfo {
    pub identity: EntityIdentity,
    pub method: String,
}

/// A runnable detection unit
///
/// Tasks are built once and then called for every chunk. A failing call
/// does not invalidate the task for later calls.
pub trait PiiTask: fmt::Display + Send + Sync {
    /// Detects PII in a chunk, returning entities ordered by start offset
    fn find(&self, chunk: &DocumentChunk) -> Result<Vec<PiiEntity>>;

    /// Task metadata
    fn task_info(&self) -> TaskInfo;

    /// The entities this task can produce
    fn pii_info(&self) -> Vec<PiiInfo>;

    /// Number of (language, native label) combinations handled
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
