//! Result type alias for the plugin

use super::errors::PluginError;

/// Result type alias for plugin operations
///
/// # Examples
///
/// ```
/// use pii_ner::domain::result::Result;
/// use pii_ner::domain::errors::PluginError;
///
/// fn failing_function() -> Result<()> {
///     Err(PluginError::Processing("no tasks for lang: fr".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PluginError>;
