//! Identifier newtypes
//!
//! Language codes key every per-language structure in the plugin (entity
//! maps, pipeline sets, model specs), so they get their own type instead of
//! a bare `String`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Language code newtype wrapper (e.g. `en`, `es`, `pt-BR`)
///
/// # Examples
///
/// ```
/// use pii_ner::domain::ids::LangCode;
///
/// let lang = LangCode::new("en").unwrap();
/// assert_eq!(lang.as_str(), "en");
/// assert!(LangCode::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LangCode(String);

impl LangCode {
    /// Creates a new language code, rejecting empty values
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err("language code cannot be empty".to_string());
        }
        if trimmed.len() == code.len() {
            Ok(Self(code))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LangCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LangCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LangCode> for String {
    fn from(value: LangCode) -> Self {
        value.0
    }
}

impl AsRef<str> for LangCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LangCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}
