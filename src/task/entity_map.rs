//! Mapping from model-native labels to canonical PII identities
//!
//! Descriptors are first filtered by layering key (`type/subtype`) and the
//! requested languages, then expanded per language into
//! `map[lang][native_label] = identity`.

use crate::config::PiiDescriptor;
use crate::domain::{EntityIdentity, LangCode, PiiInfo, PluginError, Result};
use crate::task::DEFAULT_METHOD;
use std::collections::{BTreeMap, BTreeSet};

/// Computes the PII descriptors to detect, in configuration order
///
/// A descriptor without languages removes any earlier descriptor sharing its
/// key. With a non-empty `langset`, descriptors not covering any of its
/// languages are skipped. A later descriptor replaces an earlier one with the
/// same key in place.
pub fn filter_descriptors(
    descriptors: &[PiiDescriptor],
    langset: &BTreeSet<LangCode>,
) -> Vec<PiiDescriptor> {
    let mut kept: Vec<(String, &PiiDescriptor)> = Vec::new();

    for desc in descriptors {
        let key = desc.key();
        let slot = kept.iter().position(|(k, _)| *k == key);

        if desc.is_removal() {
            if let Some(idx) = slot {
                kept.remove(idx);
            }
            continue;
        }
        if !langset.is_empty() && desc.languages().is_disjoint(langset) {
            continue;
        }
        match slot {
            Some(idx) => kept[idx].1 = desc,
            None => kept.push((key, desc)),
        }
    }

    kept.into_iter().map(|(_, desc)| desc.clone()).collect()
}

/// Languages a descriptor is active for, given an optional restriction
fn active_languages(desc: &PiiDescriptor, restrict: &BTreeSet<LangCode>) -> BTreeSet<LangCode> {
    let langs = desc.languages();
    if restrict.is_empty() {
        langs
    } else {
        langs.intersection(restrict).cloned().collect()
    }
}

/// Per-language lookup from native label to canonical identity
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    maps: BTreeMap<LangCode, BTreeMap<String, EntityIdentity>>,
    info: Vec<PiiInfo>,
}

impl EntityMap {
    /// Builds the map from descriptors, restricted to `restrict` (empty = all)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a descriptor has no native label
    /// mapping, or its per-language mapping lacks one of its languages
    pub fn build(descriptors: &[PiiDescriptor], restrict: &BTreeSet<LangCode>) -> Result<Self> {
        let mut map = Self::default();

        for desc in descriptors {
            let source = desc.extra.map.as_ref().ok_or_else(|| {
                PluginError::Configuration(format!(
                    "invalid config for NER plugin: missing field 'map' in: {}",
                    desc.key()
                ))
            })?;

            for lang in active_languages(desc, restrict) {
                let label = source.label_for(&lang).ok_or_else(|| {
                    PluginError::Configuration(format!(
                        "invalid config for NER plugin: missing field '{}' in map for: {}",
                        lang,
                        desc.key()
                    ))
                })?;
                let identity = EntityIdentity::new(
                    desc.pii,
                    Some(lang.clone()),
                    desc.country.clone(),
                    desc.subtype.clone(),
                );
                let replaced = map
                    .maps
                    .entry(lang)
                    .or_default()
                    .insert(label.to_string(), identity.clone());
                if let Some(previous) = replaced {
                    map.info.retain(|i| i.identity != previous);
                }
                map.info.push(PiiInfo {
                    identity,
                    method: desc
                        .method
                        .clone()
                        .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
                });
            }
        }

        Ok(map)
    }

    /// Languages with at least one mapped label
    pub fn languages(&self) -> BTreeSet<LangCode> {
        self.maps.keys().cloned().collect()
    }

    /// The only language of the map, if there is exactly one
    pub fn sole_language(&self) -> Option<&LangCode> {
        let mut keys = self.maps.keys();
        match (keys.next(), keys.next()) {
            (Some(lang), None) => Some(lang),
            _ => None,
        }
    }

    /// Label map for a language
    pub fn get(&self, lang: &LangCode) -> Option<&BTreeMap<String, EntityIdentity>> {
        self.maps.get(lang)
    }

    /// Entities the map can produce, one per (descriptor, language)
    ///
    /// A descriptor whose native label was taken over by a later one is not
    /// listed for that language.
    pub fn pii_info(&self) -> &[PiiInfo] {
        &self.info
    }

    /// Total number of (language, native label) entries
    pub fn len(&self) -> usize {
        self.maps.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NativeLabelSource;
    use crate::domain::PiiType;
    use serde_json::json;

    fn lang(code: &str) -> LangCode {
        LangCode::new(code).unwrap()
    }

    fn langs(codes: &[&str]) -> BTreeSet<LangCode> {
        codes.iter().map(|c| lang(c)).collect()
    }

    fn descriptors(value: serde_json::Value) -> Vec<PiiDescriptor> {
        serde_json::from_value(value).unwrap()
    }

    fn keys(list: &[PiiDescriptor]) -> Vec<String> {
        list.iter().map(PiiDescriptor::key).collect()
    }

    #[test]
    fn test_filter_removal_marker() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": "en", "extra": {"map": "PER"}},
            {"type": "LOCATION", "lang": "en", "extra": {"map": "LOC"}},
            {"type": "PERSON", "lang": null}
        ]));
        assert_eq!(keys(&filter_descriptors(&list, &BTreeSet::new())), vec!["LOCATION/None"]);
    }

    #[test]
    fn test_filter_removal_then_readd() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": "en", "extra": {"map": "PER"}},
            {"type": "LOCATION", "lang": "en", "extra": {"map": "LOC"}},
            {"type": "PERSON", "lang": null},
            {"type": "PERSON", "lang": "es", "extra": {"map": "PER"}}
        ]));
        let out = filter_descriptors(&list, &BTreeSet::new());
        assert_eq!(keys(&out), vec!["LOCATION/None", "PERSON/None"]);
        assert_eq!(out[1].languages(), langs(&["es"]));
    }

    #[test]
    fn test_filter_replace_keeps_slot() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": "en", "extra": {"map": "PER"}},
            {"type": "LOCATION", "lang": "en", "extra": {"map": "LOC"}},
            {"type": "PERSON", "lang": "en", "extra": {"map": "PERSON"}}
        ]));
        let out = filter_descriptors(&list, &BTreeSet::new());
        assert_eq!(keys(&out), vec!["PERSON/None", "LOCATION/None"]);
        assert_eq!(
            out[0].extra.map,
            Some(NativeLabelSource::Uniform("PERSON".to_string()))
        );
    }

    #[test]
    fn test_filter_subtype_is_part_of_key() {
        let list = descriptors(json!([
            {"type": "LOCATION", "subtype": "city", "lang": "en", "extra": {"map": "CITY"}},
            {"type": "LOCATION", "lang": null}
        ]));
        assert_eq!(keys(&filter_descriptors(&list, &BTreeSet::new())), vec!["LOCATION/city"]);
    }

    #[test]
    fn test_filter_language_restriction() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": ["en", "es"], "extra": {"map": "PER"}},
            {"type": "ORG", "lang": "fr", "extra": {"map": "ORG"}}
        ]));
        assert_eq!(keys(&filter_descriptors(&list, &langs(&["es"]))), vec!["PERSON/None"]);
        assert_eq!(filter_descriptors(&list, &BTreeSet::new()).len(), 2);
    }

    #[test]
    fn test_build_uniform_map() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": ["en", "es"], "extra": {"map": "PER"}},
            {"type": "LOCATION", "lang": ["en", "es"], "extra": {"map": "LOC"}}
        ]));
        let map = EntityMap::build(&list, &BTreeSet::new()).unwrap();

        assert_eq!(map.len(), 4);
        assert_eq!(map.languages(), langs(&["en", "es"]));
        assert!(map.sole_language().is_none());
        assert_eq!(map.pii_info().len(), 4);

        let es = map.get(&lang("es")).unwrap();
        assert_eq!(es["PER"].pii, PiiType::Person);
        assert_eq!(es["PER"].lang, Some(lang("es")));
        assert_eq!(map.pii_info()[0].method, DEFAULT_METHOD);
    }

    #[test]
    fn test_build_restricted() {
        let list = descriptors(json!([
            {"type": "PERSON", "lang": ["en", "es"], "extra": {"map": "PER"}}
        ]));
        let map = EntityMap::build(&list, &langs(&["en"])).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.sole_language(), Some(&lang("en")));
    }

    #[test]
    fn test_build_per_language_map() {
        let list = descriptors(json!([
            {"type": "LOCATION", "lang": ["en", "es"], "country": "any",
             "extra": {"map": {"en": "LOC", "es": "LUG"}}}
        ]));
        let map = EntityMap::build(&list, &BTreeSet::new()).unwrap();
        assert!(map.get(&lang("es")).unwrap().contains_key("LUG"));
        assert_eq!(
            map.get(&lang("en")).unwrap()["LOC"].country.as_deref(),
            Some("any")
        );
    }

    #[test]
    fn test_build_per_language_map_missing_lang() {
        let list = descriptors(json!([
            {"type": "LOCATION", "lang": ["en", "es"], "extra": {"map": {"en": "LOC"}}}
        ]));
        let err = EntityMap::build(&list, &BTreeSet::new()).unwrap_err();
        assert!(err.is_config());
        assert!(err.message().contains("'es'"));

        // Restricting away the unmapped language is fine
        assert!(EntityMap::build(&list, &langs(&["en"])).is_ok());
    }

    #[test]
    fn test_build_missing_map() {
        let list = descriptors(json!([{"type": "PERSON", "lang": "en"}]));
        let err = EntityMap::build(&list, &BTreeSet::new()).unwrap_err();
        assert!(err.is_config());
        assert!(err.message().contains("'map'"));
    }

    #[test]
    fn test_build_last_label_wins() {
        let list = descriptors(json!([
            {"type": "ORG", "lang": "en", "extra": {"map": "ORG"}},
            {"type": "NORP", "lang": "en", "extra": {"map": "ORG"}}
        ]));
        let map = EntityMap::build(&list, &BTreeSet::new()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&lang("en")).unwrap()["ORG"].pii, PiiType::Norp);

        let listed: Vec<PiiType> = map.pii_info().iter().map(|i| i.identity.pii).collect();
        assert_eq!(listed, vec![PiiType::Norp]);
    }

    #[test]
    fn test_build_takeover_is_per_language() {
        let list = descriptors(json!([
            {"type": "ORG", "lang": ["en", "es"], "extra": {"map": "ORG"}},
            {"type": "NORP", "lang": "en", "extra": {"map": "ORG"}}
        ]));
        let map = EntityMap::build(&list, &BTreeSet::new()).unwrap();
        assert_eq!(map.len(), 2);

        let listed: Vec<(PiiType, &str)> = map
            .pii_info()
            .iter()
            .map(|i| (i.identity.pii, i.identity.lang.as_ref().map_or("", LangCode::as_str)))
            .collect();
        assert_eq!(listed, vec![(PiiType::Org, "es"), (PiiType::Norp, "en")]);
    }
}
