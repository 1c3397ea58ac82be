//! Persisted result types
//!
//! A `ResponseRecord` is one accepted rating; a `ResultBundle` is the durable
//! unit written once per completed session, keyed by `user_id`. Records store
//! the raw submitted score plus the `swap` flag; the de-biasing correction is
//! applied downstream by the analyzer, never here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trial::{TestFamily, TestTypeTag, TrialSpec};

/// One accepted rating submission
///
/// Edit-fidelity trials record `naturalness_score` and `editing_score` and
/// leave `score` unset; every other type records `score` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub test_type: TestTypeTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<String>,

    pub target_audio: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_system: Option<String>,

    #[serde(default)]
    pub swap: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naturalness_score: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editing_score: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_transcript: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<BTreeMap<String, String>>,
}

impl ResponseRecord {
    /// Build a record for a trial and a validated primary score, with the
    /// edit-fidelity split applied.
    pub fn for_trial(
        trial: &TrialSpec,
        score: i32,
        editing_score: Option<i32>,
        url_params: &BTreeMap<String, String>,
    ) -> ResponseRecord {
        let is_edit = trial.test_type.family() == TestFamily::EditFidelity;
        ResponseRecord {
            test_type: trial.test_type,
            reference_audio: trial.reference.clone(),
            target_audio: trial.target.clone(),
            ref_system: trial.ref_system.clone(),
            target_system: trial.target_system_name().map(String::from),
            swap: trial.swap,
            score: (!is_edit).then_some(score),
            naturalness_score: is_edit.then_some(score),
            editing_score: if is_edit { editing_score } else { None },
            edited_transcript: if is_edit {
                trial.edited_transcript.clone()
            } else {
                None
            },
            url_params: if url_params.is_empty() {
                None
            } else {
                Some(url_params.clone())
            },
        }
    }
}

/// The durable per-participant record, written exactly once per completed
/// session and overwritten wholesale on re-completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<ResponseRecord>,
}
