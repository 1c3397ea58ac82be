//! Trial catalog loading
//!
//! The catalog file is a JSON object keyed by test-type string; each value is
//! an array of comparison groups, each group an array of trial objects
//! sharing the same system pairing or metadata source. Loading is pure: the
//! nested structure is validated and held in memory, nothing is mutated.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::trial::{TestTypeTag, TrialSpec};

/// In-memory candidate-trial catalog, bucketed by test type
///
/// Buckets iterate in a deterministic (tag-sorted) order so that sampled
/// sessions depend only on the RNG, not on map iteration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buckets: BTreeMap<TestTypeTag, Vec<Vec<TrialSpec>>>,
}

impl Catalog {
    /// Load and validate a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::CatalogNotFound(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Parse a catalog from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)
            .map_err(|e| Error::CatalogMalformed(e.to_string()))?;

        let mut buckets: BTreeMap<TestTypeTag, Vec<Vec<TrialSpec>>> = BTreeMap::new();
        for (key, value) in raw {
            let tag: TestTypeTag = key.parse()?;
            let groups_raw = value.as_array().ok_or_else(|| {
                Error::CatalogMalformed(format!("bucket '{key}' is not an array of groups"))
            })?;

            let mut groups = Vec::with_capacity(groups_raw.len());
            for (gi, group_raw) in groups_raw.iter().enumerate() {
                let trials_raw = group_raw.as_array().ok_or_else(|| {
                    Error::CatalogMalformed(format!(
                        "bucket '{key}' group {gi} is not an array of trials"
                    ))
                })?;

                let mut group = Vec::with_capacity(trials_raw.len());
                for (ti, trial_raw) in trials_raw.iter().enumerate() {
                    // Surface an unknown type as UnknownTrialType rather than
                    // a generic deserialization failure.
                    let type_str = trial_raw
                        .get("type")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            Error::CatalogMalformed(format!(
                                "bucket '{key}' group {gi} trial {ti}: missing 'type'"
                            ))
                        })?;
                    let trial_tag: TestTypeTag = type_str.parse()?;
                    if trial_tag.family() != tag.family() {
                        return Err(Error::CatalogMalformed(format!(
                            "bucket '{key}' group {gi} trial {ti}: type '{type_str}' \
                             does not belong to this bucket"
                        )));
                    }

                    let trial: TrialSpec =
                        serde_json::from_value(trial_raw.clone()).map_err(|e| {
                            Error::CatalogMalformed(format!(
                                "bucket '{key}' group {gi} trial {ti}: {e}"
                            ))
                        })?;
                    group.push(trial);
                }
                groups.push(group);
            }
            buckets.entry(tag).or_default().extend(groups);
        }

        Ok(Catalog { buckets })
    }

    /// Buckets in deterministic tag order
    pub fn buckets(&self) -> impl Iterator<Item = (TestTypeTag, &[Vec<TrialSpec>])> {
        self.buckets.iter().map(|(tag, groups)| (*tag, groups.as_slice()))
    }

    /// Comparison groups for one test type (empty if the type is absent)
    pub fn groups(&self, tag: TestTypeTag) -> &[Vec<TrialSpec>] {
        self.buckets.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Test types present in the catalog
    pub fn tags(&self) -> Vec<TestTypeTag> {
        self.buckets.keys().copied().collect()
    }

    pub fn num_groups(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn total_candidates(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|groups| groups.iter().map(Vec::len))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_candidates() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "CMOS": [
            [
                {"type": "CMOS", "reference": "gt/1.wav", "target": "sysA/1.wav",
                 "ref_system": "ground_truth", "target_system": "sysA"},
                {"type": "CMOS", "reference": "gt/2.wav", "target": "sysA/2.wav",
                 "ref_system": "ground_truth", "target_system": "sysA", "swap": true}
            ],
            [
                {"type": "CMOS", "reference": "gt/1.wav", "target": "sysB/1.wav",
                 "ref_system": "ground_truth", "target_system": "sysB"}
            ]
        ],
        "QMOS": [
            [
                {"type": "QMOS", "target": "sysA/1.wav", "target_system": "sysA"}
            ]
        ]
    }"#;

    #[test]
    fn loads_nested_structure() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(catalog.tags(), vec![TestTypeTag::Comparative, TestTypeTag::Quality]);
        assert_eq!(catalog.groups(TestTypeTag::Comparative).len(), 2);
        assert_eq!(catalog.num_groups(), 3);
        assert_eq!(catalog.total_candidates(), 4);
    }

    #[test]
    fn missing_file_is_catalog_not_found() {
        let err = Catalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, Error::CatalogNotFound(_)));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.total_candidates(), 4);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = Catalog::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::CatalogMalformed(_)));
    }

    #[test]
    fn unknown_type_is_surfaced() {
        let err = Catalog::from_json_str(r#"{"XMOS": [[]]}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownTrialType(t) if t == "XMOS"));
    }

    #[test]
    fn trial_missing_target_is_malformed() {
        let err = Catalog::from_json_str(
            r#"{"QMOS": [[{"type": "QMOS", "target_system": "sysA"}]]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::CatalogMalformed(_)));
    }

    #[test]
    fn trial_type_must_match_bucket() {
        let err = Catalog::from_json_str(
            r#"{"CMOS": [[{"type": "QMOS", "target": "a.wav"}]]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::CatalogMalformed(_)));
    }

    #[test]
    fn absent_bucket_yields_empty_groups() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        assert!(catalog.groups(TestTypeTag::Naturalness).is_empty());
    }
}
