//! Model weight cache directory
//!
//! The inference backend reads the cache location from the process
//! environment, so the directory must be resolved and exported before any
//! pipeline is created.

use crate::domain::{PluginError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the model hub cache location
pub const ENV_HF_CACHE: &str = "HUGGINGFACE_HUB_CACHE";

/// Fallback location, relative to the installation prefix
const PREFIX_CACHE_DIR: &[&str] = &["var", "pii-ner", "hf-cache"];

/// Installation prefix: the parent of the directory holding the executable
fn install_prefix() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves the cache directory: explicit value, then environment, then prefix
pub fn resolve_cachedir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.as_os_str().is_empty()) {
        return dir.to_path_buf();
    }
    match env::var_os(ENV_HF_CACHE) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PREFIX_CACHE_DIR
            .iter()
            .fold(install_prefix(), |path, part| path.join(part)),
    }
}

/// Resolves the cache directory, creates it if needed and exports it
///
/// # Errors
///
/// Returns a file error if the directory cannot be created
pub fn prepare_cachedir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = resolve_cachedir(explicit);
    if !dir.is_dir() {
        fs::create_dir_all(&dir).map_err(|e| {
            PluginError::File(format!(
                "cannot create model cache dir '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }
    env::set_var(ENV_HF_CACHE, &dir);
    tracing::debug!(cachedir = %dir.display(), "Model cache directory ready");
    Ok(dir)
}
