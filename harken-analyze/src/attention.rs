//! Attention-check filtering
//!
//! An attention trial presents a known-identical audio pair whose expected
//! score is encoded in the audio filename's trailing `_<n>` token (e.g.
//! `attention_2.wav` expects a score of 2). A session that misses any of its
//! attention checks is discarded wholesale - this is a data-quality filter,
//! not an error path.

use std::path::Path;

use harken_common::results::ResponseRecord;
use harken_common::trial::TestTypeTag;

/// Expected score parsed from an attention audio path, if encoded
pub fn expected_attention_score(audio_path: &str) -> Option<i32> {
    let stem = Path::new(audio_path).file_stem()?.to_str()?;
    let token = stem.rsplit('_').next()?;
    token.parse().ok()
}

/// Whether every attention check in a session was answered correctly.
///
/// An attention record with no submitted score or an undecodable filename
/// counts as a failure: the bundle cannot be trusted either way.
pub fn passes_attention_checks(results: &[ResponseRecord]) -> bool {
    results
        .iter()
        .filter(|r| r.test_type == TestTypeTag::Attention)
        .all(|r| {
            let audio = r.reference_audio.as_deref().unwrap_or(&r.target_audio);
            match (expected_attention_score(audio), r.score) {
                (Some(expected), Some(actual)) => expected == actual,
                _ => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attention_record(audio: &str, score: Option<i32>) -> ResponseRecord {
        ResponseRecord {
            test_type: TestTypeTag::Attention,
            reference_audio: Some(audio.to_string()),
            target_audio: audio.to_string(),
            ref_system: None,
            target_system: None,
            swap: false,
            score,
            naturalness_score: None,
            editing_score: None,
            edited_transcript: None,
            url_params: None,
        }
    }

    #[test]
    fn parses_expected_score_from_filename() {
        assert_eq!(expected_attention_score("audios/attention_2.wav"), Some(2));
        assert_eq!(expected_attention_score("audios/attention_-3.wav"), Some(-3));
        assert_eq!(expected_attention_score("deep/path/check_0.flac"), Some(0));
        assert_eq!(expected_attention_score("audios/attention_high.wav"), None);
        assert_eq!(expected_attention_score(""), None);
    }

    #[test]
    fn all_correct_checks_pass() {
        let results = vec![
            attention_record("audios/attention_2.wav", Some(2)),
            attention_record("audios/attention_0.wav", Some(0)),
        ];
        assert!(passes_attention_checks(&results));
    }

    #[test]
    fn one_wrong_check_fails_the_session() {
        let results = vec![
            attention_record("audios/attention_2.wav", Some(2)),
            attention_record("audios/attention_0.wav", Some(3)),
        ];
        assert!(!passes_attention_checks(&results));
    }

    #[test]
    fn missing_score_or_undecodable_filename_fails() {
        assert!(!passes_attention_checks(&[attention_record(
            "audios/attention_2.wav",
            None
        )]));
        assert!(!passes_attention_checks(&[attention_record(
            "audios/attention_high.wav",
            Some(2)
        )]));
    }

    #[test]
    fn sessions_without_attention_trials_pass() {
        assert!(passes_attention_checks(&[]));
    }
}
