//! Trial types and the test-type tag set
//!
//! A `TrialSpec` is one sampled rating trial, immutable once drawn. The tag
//! set is closed: six test families, each with a scored variant and (except
//! attention checks) an instruction variant shown as a worked example.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Test family, independent of the scored/instruction distinction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestFamily {
    /// SMOS - speaker similarity between reference and target
    Similarity,
    /// CMOS - signed preference between two samples
    Comparative,
    /// QMOS - absolute quality, no reference
    Quality,
    /// NMOS - absolute naturalness, no reference
    Naturalness,
    /// EMOS - naturalness plus edit-fidelity of an edited transcript
    EditFidelity,
    /// Known-answer trial for rater attentiveness
    Attention,
}

/// Closed tag enum determining descriptor variant and rating-scale bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestTypeTag {
    Similarity,
    SimilarityInstruction,
    Comparative,
    ComparativeInstruction,
    Quality,
    QualityInstruction,
    Naturalness,
    NaturalnessInstruction,
    EditFidelity,
    EditFidelityInstruction,
    Attention,
}

impl TestTypeTag {
    /// Canonical catalog spelling: scored types uppercase acronyms,
    /// instruction types lowercase with `_instruction` suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestTypeTag::Similarity => "SMOS",
            TestTypeTag::SimilarityInstruction => "smos_instruction",
            TestTypeTag::Comparative => "CMOS",
            TestTypeTag::ComparativeInstruction => "cmos_instruction",
            TestTypeTag::Quality => "QMOS",
            TestTypeTag::QualityInstruction => "qmos_instruction",
            TestTypeTag::Naturalness => "NMOS",
            TestTypeTag::NaturalnessInstruction => "nmos_instruction",
            TestTypeTag::EditFidelity => "EMOS",
            TestTypeTag::EditFidelityInstruction => "emos_instruction",
            TestTypeTag::Attention => "attention",
        }
    }

    pub fn family(&self) -> TestFamily {
        match self {
            TestTypeTag::Similarity | TestTypeTag::SimilarityInstruction => TestFamily::Similarity,
            TestTypeTag::Comparative | TestTypeTag::ComparativeInstruction => {
                TestFamily::Comparative
            }
            TestTypeTag::Quality | TestTypeTag::QualityInstruction => TestFamily::Quality,
            TestTypeTag::Naturalness | TestTypeTag::NaturalnessInstruction => {
                TestFamily::Naturalness
            }
            TestTypeTag::EditFidelity | TestTypeTag::EditFidelityInstruction => {
                TestFamily::EditFidelity
            }
            TestTypeTag::Attention => TestFamily::Attention,
        }
    }

    /// Instruction trials are illustrative and carry a correct-answer hint
    pub fn is_instruction(&self) -> bool {
        matches!(
            self,
            TestTypeTag::SimilarityInstruction
                | TestTypeTag::ComparativeInstruction
                | TestTypeTag::QualityInstruction
                | TestTypeTag::NaturalnessInstruction
                | TestTypeTag::EditFidelityInstruction
        )
    }

    /// Whether the reference audio slot is shown for this test type
    pub fn needs_reference(&self) -> bool {
        matches!(
            self.family(),
            TestFamily::Similarity | TestFamily::Comparative | TestFamily::Attention
        )
    }

    /// Instruction tag for a scored tag, if one exists
    pub fn instruction_variant(&self) -> Option<TestTypeTag> {
        match self.family() {
            TestFamily::Similarity => Some(TestTypeTag::SimilarityInstruction),
            TestFamily::Comparative => Some(TestTypeTag::ComparativeInstruction),
            TestFamily::Quality => Some(TestTypeTag::QualityInstruction),
            TestFamily::Naturalness => Some(TestTypeTag::NaturalnessInstruction),
            TestFamily::EditFidelity => Some(TestTypeTag::EditFidelityInstruction),
            TestFamily::Attention => None,
        }
    }

    pub fn all() -> &'static [TestTypeTag] {
        &[
            TestTypeTag::Similarity,
            TestTypeTag::SimilarityInstruction,
            TestTypeTag::Comparative,
            TestTypeTag::ComparativeInstruction,
            TestTypeTag::Quality,
            TestTypeTag::QualityInstruction,
            TestTypeTag::Naturalness,
            TestTypeTag::NaturalnessInstruction,
            TestTypeTag::EditFidelity,
            TestTypeTag::EditFidelityInstruction,
            TestTypeTag::Attention,
        ]
    }
}

impl FromStr for TestTypeTag {
    type Err = Error;

    /// Accepts both the uppercase and lowercase spellings that appear in
    /// existing catalogs and result files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMOS" | "smos" => Ok(TestTypeTag::Similarity),
            "smos_instruction" => Ok(TestTypeTag::SimilarityInstruction),
            "CMOS" | "cmos" => Ok(TestTypeTag::Comparative),
            "cmos_instruction" => Ok(TestTypeTag::ComparativeInstruction),
            "QMOS" | "qmos" => Ok(TestTypeTag::Quality),
            "qmos_instruction" => Ok(TestTypeTag::QualityInstruction),
            "NMOS" | "nmos" => Ok(TestTypeTag::Naturalness),
            "nmos_instruction" => Ok(TestTypeTag::NaturalnessInstruction),
            "EMOS" | "emos" => Ok(TestTypeTag::EditFidelity),
            "emos_instruction" => Ok(TestTypeTag::EditFidelityInstruction),
            "attention" => Ok(TestTypeTag::Attention),
            other => Err(Error::UnknownTrialType(other.to_string())),
        }
    }
}

impl fmt::Display for TestTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TestTypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TestTypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            D::Error::custom(format!("unknown test type: {s}"))
        })
    }
}

/// One candidate or sampled rating trial
///
/// `reference` is `None` for reference-free types. `swap` marks that the
/// reference/target identities were flipped for de-biasing; the analyzer
/// un-flips during aggregation, never the web service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    #[serde(rename = "type")]
    pub test_type: TestTypeTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_system: Option<String>,

    /// Legacy single-system field written by older catalog builders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default)]
    pub swap: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_transcript: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalst_line: Option<u64>,
}

impl TrialSpec {
    /// Reference path if the trial's type actually shows a reference slot.
    ///
    /// Catalogs sometimes carry an empty-string reference for reference-free
    /// types; that is normalized away here.
    pub fn effective_reference(&self) -> Option<&str> {
        if !self.test_type.needs_reference() {
            return None;
        }
        self.reference.as_deref().filter(|r| !r.is_empty())
    }

    /// System the target slot is attributed to, falling back to the legacy
    /// single-system field.
    pub fn target_system_name(&self) -> Option<&str> {
        self.target_system.as_deref().or(self.system.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_parses_both_spellings() {
        assert_eq!("SMOS".parse::<TestTypeTag>().unwrap(), TestTypeTag::Similarity);
        assert_eq!("smos".parse::<TestTypeTag>().unwrap(), TestTypeTag::Similarity);
        assert_eq!(
            "cmos_instruction".parse::<TestTypeTag>().unwrap(),
            TestTypeTag::ComparativeInstruction
        );
        assert_eq!("attention".parse::<TestTypeTag>().unwrap(), TestTypeTag::Attention);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let err = "dmos".parse::<TestTypeTag>().unwrap_err();
        assert!(matches!(err, Error::UnknownTrialType(t) if t == "dmos"));
    }

    #[test]
    fn reference_free_families_hide_reference_slot() {
        assert!(TestTypeTag::Similarity.needs_reference());
        assert!(TestTypeTag::Comparative.needs_reference());
        assert!(TestTypeTag::Attention.needs_reference());
        assert!(!TestTypeTag::Quality.needs_reference());
        assert!(!TestTypeTag::Naturalness.needs_reference());
        assert!(!TestTypeTag::EditFidelity.needs_reference());
    }

    #[test]
    fn empty_reference_is_normalized() {
        let trial = TrialSpec {
            test_type: TestTypeTag::EditFidelity,
            reference: Some(String::new()),
            target: "audios/3.wav".into(),
            ref_system: None,
            target_system: Some("sysA".into()),
            system: None,
            swap: false,
            edited_transcript: Some("edited text".into()),
            ref_filename: None,
            target_filename: None,
            metalst_line: None,
        };
        assert_eq!(trial.effective_reference(), None);
    }

    #[test]
    fn trial_round_trips_through_json() {
        let json = r#"{
            "type": "CMOS",
            "reference": "a/ref.wav",
            "target": "b/tgt.wav",
            "ref_system": "ground_truth",
            "target_system": "system_b",
            "swap": true
        }"#;
        let trial: TrialSpec = serde_json::from_str(json).unwrap();
        assert_eq!(trial.test_type, TestTypeTag::Comparative);
        assert!(trial.swap);
        let back = serde_json::to_value(&trial).unwrap();
        assert_eq!(back["type"], "CMOS");
        assert_eq!(back["swap"], true);
    }
}
