//! Document chunks, the unit of text handed to detection tasks

use super::ids::LangCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context attached to a chunk by the host framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkContext {
    /// Language of the chunk text, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LangCode>,

    /// Any other context fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkContext {
    pub fn with_lang(lang: LangCode) -> Self {
        Self {
            lang: Some(lang),
            extra: Map::new(),
        }
    }
}

/// A piece of a document to be analyzed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ChunkContext>,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: ChunkContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Shorthand for a chunk whose context only carries a language
    pub fn with_lang(self, lang: LangCode) -> Self {
        self.with_context(ChunkContext::with_lang(lang))
    }

    /// Language declared in the chunk context
    pub fn lang(&self) -> Option<&LangCode> {
        self.context.as_ref().and_then(|c| c.lang.as_ref())
    }
}
