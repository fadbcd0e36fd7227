//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod detect;
pub mod info;

use anyhow::Context;

/// Runs a blocking closure (model loading, inference) off the async runtime
pub(crate) async fn run_blocking<F, T>(what: &'static str, f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> crate::domain::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .with_context(|| format!("{what} task panicked"))?;
    Ok(result?)
}
