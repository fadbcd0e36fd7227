//! Collections of detected PII entities and output helpers

use super::pii::PiiEntity;
use super::result::Result;
use super::task::TaskInfo;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// The detector that produced a set of entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorInfo {
    pub source: String,
    pub name: String,
    pub version: String,
    pub method: String,
}

impl From<&TaskInfo> for DetectorInfo {
    fn from(info: &TaskInfo) -> Self {
        Self {
            source: info.source.clone(),
            name: info.name.clone(),
            version: info.version.clone(),
            method: info.method.clone(),
        }
    }
}

/// An ordered collection of detected entities
#[derive(Debug, Clone, Default)]
pub struct PiiCollection {
    detector: Option<DetectorInfo>,
    entities: Vec<PiiEntity>,
}

impl PiiCollection {
    pub fn new(detector: DetectorInfo) -> Self {
        Self {
            detector: Some(detector),
            entities: Vec::new(),
        }
    }

    pub fn add(&mut self, entity: PiiEntity) {
        self.entities.push(entity);
    }

    pub fn detector(&self) -> Option<&DetectorInfo> {
        self.detector.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PiiEntity> {
        self.entities.iter()
    }

    /// Writes one JSON record per line
    pub fn dump_jsonl<W: Write>(&self, mut out: W) -> Result<()> {
        for entity in &self.entities {
            serde_json::to_writer(&mut out, &entity.to_record())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Extend<PiiEntity> for PiiCollection {
    fn extend<T: IntoIterator<Item = PiiEntity>>(&mut self, iter: T) {
        self.entities.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PiiCollection {
    type Item = &'a PiiEntity;
    type IntoIter = std::slice::Iter<'a, PiiEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

/// Replaces every entity in `text` by an annotated `<TYPE:value>` marker
///
/// Offsets are character offsets; entities are applied in start order and
/// overlapping entities are skipped.
pub fn annotate<'a, I>(text: &str, entities: I) -> String
where
    I: IntoIterator<Item = &'a PiiEntity>,
{
    let mut sorted: Vec<&PiiEntity> = entities.into_iter().collect();
    sorted.sort_by_key(|e| e.start);

    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    let mut pos = 0;
    for entity in sorted {
        if entity.start < pos || entity.start > chars.len() {
            continue;
        }
        output.extend(&chars[pos..entity.start]);
        output.push_str(&format!("<{}:{}>", entity.info.pii, entity.value));
        pos = entity.end().min(chars.len());
    }
    output.extend(&chars[pos..]);
    output
}
