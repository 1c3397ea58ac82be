//! Score aggregation with deferred swap correction
//!
//! The web service records raw scores plus the `swap` flag; the correction
//! happens exactly once, here: a swapped trial's score is negated and
//! attributed to `ref_system`, because the slots the rater saw were flipped.
//! The correction applies to the reference-bearing similarity and
//! comparative families; reference-free scores are attributed to
//! `target_system` as recorded.
//!
//! Instruction trials (worked examples) and attention checks never enter
//! the aggregates.

use std::collections::BTreeMap;

use harken_common::results::ResponseRecord;
use harken_common::trial::{TestFamily, TestTypeTag};

use crate::stats::{confidence_interval_95, Stats};

/// Per-system and per-utterance aggregates over all valid records
#[derive(Debug, Default)]
pub struct Aggregates {
    /// test type -> system -> stats
    pub per_system: BTreeMap<TestTypeTag, BTreeMap<String, Stats>>,
    /// edit-fidelity editing-effect scores, per system
    pub editing_per_system: BTreeMap<String, Stats>,
    /// test type -> system -> utterance audio -> stats
    pub per_utterance: BTreeMap<TestTypeTag, BTreeMap<String, BTreeMap<String, Stats>>>,
}

/// Swap-corrected (system, utterance audio, score) attribution for one
/// record; `None` if the record carries no usable score or system.
pub fn corrected(record: &ResponseRecord) -> Option<(String, String, f64)> {
    let raw = record.score.or(record.naturalness_score)? as f64;
    let family = record.test_type.family();
    let swap_applies = matches!(family, TestFamily::Similarity | TestFamily::Comparative);

    if swap_applies && record.swap {
        let system = record.ref_system.clone()?;
        let audio = record
            .reference_audio
            .clone()
            .unwrap_or_else(|| record.target_audio.clone());
        Some((system, audio, -raw))
    } else {
        let system = record.target_system.clone()?;
        Some((system, record.target_audio.clone(), raw))
    }
}

/// Aggregate every scored, non-instruction, non-attention record
pub fn aggregate(records: &[ResponseRecord]) -> Aggregates {
    let mut system_scores: BTreeMap<TestTypeTag, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    let mut utterance_scores: BTreeMap<TestTypeTag, BTreeMap<String, BTreeMap<String, Vec<f64>>>> =
        BTreeMap::new();
    let mut editing_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for record in records {
        if record.test_type.is_instruction() || record.test_type.family() == TestFamily::Attention
        {
            continue;
        }
        let Some((system, audio, score)) = corrected(record) else {
            continue;
        };

        system_scores
            .entry(record.test_type)
            .or_default()
            .entry(system.clone())
            .or_default()
            .push(score);
        utterance_scores
            .entry(record.test_type)
            .or_default()
            .entry(system.clone())
            .or_default()
            .entry(audio)
            .or_default()
            .push(score);

        if record.test_type.family() == TestFamily::EditFidelity {
            if let Some(editing) = record.editing_score {
                editing_scores.entry(system).or_default().push(editing as f64);
            }
        }
    }

    let to_stats = |values: Vec<f64>| {
        confidence_interval_95(&values).expect("aggregation groups are non-empty")
    };

    Aggregates {
        per_system: system_scores
            .into_iter()
            .map(|(tag, by_system)| {
                (
                    tag,
                    by_system
                        .into_iter()
                        .map(|(system, values)| (system, to_stats(values)))
                        .collect(),
                )
            })
            .collect(),
        editing_per_system: editing_scores
            .into_iter()
            .map(|(system, values)| (system, to_stats(values)))
            .collect(),
        per_utterance: utterance_scores
            .into_iter()
            .map(|(tag, by_system)| {
                (
                    tag,
                    by_system
                        .into_iter()
                        .map(|(system, by_utterance)| {
                            (
                                system,
                                by_utterance
                                    .into_iter()
                                    .map(|(audio, values)| (audio, to_stats(values)))
                                    .collect(),
                            )
                        })
                        .collect(),
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: serde_json::Value) -> ResponseRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn swapped_comparative_score_negates_and_relabels() {
        // {ref_system: "A", target_system: "B", swap: true, score: 2} must be
        // read as system A scoring -2 relative to B.
        let r = record(serde_json::json!({
            "test_type": "CMOS",
            "reference_audio": "a/1.wav",
            "target_audio": "b/1.wav",
            "ref_system": "A",
            "target_system": "B",
            "swap": true,
            "score": 2
        }));
        let (system, audio, score) = corrected(&r).unwrap();
        assert_eq!(system, "A");
        assert_eq!(audio, "a/1.wav");
        assert_eq!(score, -2.0);
    }

    #[test]
    fn unswapped_comparative_score_is_taken_as_is() {
        let r = record(serde_json::json!({
            "test_type": "CMOS",
            "reference_audio": "a/1.wav",
            "target_audio": "b/1.wav",
            "ref_system": "A",
            "target_system": "B",
            "swap": false,
            "score": 2
        }));
        let (system, _, score) = corrected(&r).unwrap();
        assert_eq!(system, "B");
        assert_eq!(score, 2.0);
    }

    #[test]
    fn swap_flag_ignored_for_reference_free_types() {
        let r = record(serde_json::json!({
            "test_type": "QMOS",
            "target_audio": "b/1.wav",
            "target_system": "B",
            "swap": true,
            "score": 4
        }));
        let (system, _, score) = corrected(&r).unwrap();
        assert_eq!(system, "B");
        assert_eq!(score, 4.0);
    }

    #[test]
    fn instruction_and_attention_records_are_excluded() {
        let records = vec![
            record(serde_json::json!({
                "test_type": "cmos_instruction",
                "target_audio": "x.wav",
                "target_system": "B",
                "score": 0
            })),
            record(serde_json::json!({
                "test_type": "attention",
                "reference_audio": "attention_2.wav",
                "target_audio": "attention_2.wav",
                "score": 2
            })),
        ];
        let aggregates = aggregate(&records);
        assert!(aggregates.per_system.is_empty());
    }

    #[test]
    fn aggregates_group_by_type_system_and_utterance() {
        let records = vec![
            record(serde_json::json!({
                "test_type": "CMOS", "reference_audio": "gt/1.wav",
                "target_audio": "b/1.wav", "ref_system": "gt",
                "target_system": "B", "score": 1
            })),
            record(serde_json::json!({
                "test_type": "CMOS", "reference_audio": "gt/1.wav",
                "target_audio": "b/1.wav", "ref_system": "gt",
                "target_system": "B", "score": 3
            })),
            record(serde_json::json!({
                "test_type": "CMOS", "reference_audio": "gt/2.wav",
                "target_audio": "b/2.wav", "ref_system": "gt",
                "target_system": "B", "score": -1
            })),
        ];
        let aggregates = aggregate(&records);
        let by_system = &aggregates.per_system[&TestTypeTag::Comparative];
        assert_eq!(by_system["B"].n_samples, 3);
        assert!((by_system["B"].mean - 1.0).abs() < 1e-9);

        let by_utterance = &aggregates.per_utterance[&TestTypeTag::Comparative]["B"];
        assert_eq!(by_utterance["b/1.wav"].n_samples, 2);
        assert_eq!(by_utterance["b/2.wav"].n_samples, 1);
    }

    #[test]
    fn edit_fidelity_splits_naturalness_and_editing() {
        let records = vec![record(serde_json::json!({
            "test_type": "EMOS",
            "target_audio": "b/7.wav",
            "target_system": "B",
            "naturalness_score": 4,
            "editing_score": 2,
            "edited_transcript": "edited"
        }))];
        let aggregates = aggregate(&records);
        let naturalness = &aggregates.per_system[&TestTypeTag::EditFidelity]["B"];
        assert_eq!(naturalness.mean, 4.0);
        assert_eq!(aggregates.editing_per_system["B"].mean, 2.0);
    }
}
