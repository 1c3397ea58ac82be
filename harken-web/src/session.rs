//! Session state machine and session store
//!
//! One `Session` per active participant: the sampled trial sequence, a
//! cursor, accumulated responses, and per-slot played flags. The machine
//! moves `Unidentified -> InProgress` when a valid identity materializes the
//! sequence (sessions only exist from that point; the identity form is the
//! unidentified state), self-loops on each accepted submission, and moves to
//! `Completed` exactly once when the cursor reaches the trial count.
//!
//! Sessions live in a token-keyed store; nothing session-scoped is ever held
//! in process-wide fields, so concurrent participants cannot corrupt each
//! other. Abandoned sessions persist nothing and are swept by TTL.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use harken_common::error::{Error, Result};
use harken_common::identity::Identity;
use harken_common::results::{ResponseRecord, ResultBundle};
use harken_common::trial::TrialSpec;

use crate::descriptor::DescriptorRegistry;

/// Audio slot addressed by a playback-finished notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSlot {
    Reference,
    Target,
}

/// Per-slot playback-completion flags, reset on every trial advance
#[derive(Debug, Clone, Copy, Default)]
struct PlayedFlags {
    reference: bool,
    target: bool,
}

impl PlayedFlags {
    fn mark(&mut self, slot: AudioSlot) {
        match slot {
            AudioSlot::Reference => self.reference = true,
            AudioSlot::Target => self.target = true,
        }
    }

    fn satisfied(&self, needs_reference: bool) -> bool {
        self.target && (!needs_reference || self.reference)
    }

    fn reset(&mut self) {
        *self = PlayedFlags::default();
    }
}

/// Outcome of an accepted submission
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Cursor advanced; another trial awaits
    Advanced,
    /// Final trial answered; the bundle must be persisted exactly once
    Completed(ResultBundle),
}

/// One active rating session
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub identity: Identity,
    pub url_params: BTreeMap<String, String>,
    trials: Vec<TrialSpec>,
    cursor: usize,
    responses: Vec<ResponseRecord>,
    played: PlayedFlags,
    created_at: DateTime<Utc>,
}

impl Session {
    /// `Unidentified -> InProgress`: a valid identity materializes the
    /// sampled sequence and resets the cursor.
    pub fn start(
        identity: Identity,
        url_params: BTreeMap<String, String>,
        trials: Vec<TrialSpec>,
    ) -> Session {
        Session {
            id: Uuid::new_v4(),
            identity,
            url_params,
            trials,
            cursor: 0,
            responses: Vec::new(),
            played: PlayedFlags::default(),
            created_at: Utc::now(),
        }
    }

    pub fn current_trial(&self) -> Option<&TrialSpec> {
        self.trials.get(self.cursor)
    }

    pub fn total_trials(&self) -> usize {
        self.trials.len()
    }

    pub fn completed_trials(&self) -> usize {
        self.cursor
    }

    pub fn is_completed(&self) -> bool {
        self.cursor >= self.trials.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Playback-finished notification for one slot
    pub fn mark_played(&mut self, slot: AudioSlot) {
        self.played.mark(slot);
    }

    /// Process a rating submission.
    ///
    /// A submission is accepted only if the required audio slots were played
    /// to completion and the score lies inside the current descriptor's
    /// scale (plus, for edit-fidelity, an in-range editing score). A
    /// rejected submission returns a recoverable error and changes nothing:
    /// same cursor, same responses, same flags.
    pub fn submit(
        &mut self,
        registry: &DescriptorRegistry,
        score: Option<i32>,
        editing_score: Option<i32>,
    ) -> Result<SubmitOutcome> {
        let trial = self
            .trials
            .get(self.cursor)
            .ok_or_else(|| Error::SessionNotFound(self.id.to_string()))?;
        let descriptor = registry.create(trial)?;

        if !self.played.satisfied(descriptor.needs_reference_audio()) {
            return Err(Error::IncompletePlayback(
                "Please finish listening to all given audio to completion".to_string(),
            ));
        }

        let score = score.ok_or_else(|| Error::MissingScore("Please select a score".to_string()))?;
        if !descriptor.validate(score) {
            let scale = descriptor.rating_scale();
            return Err(Error::ScoreOutOfRange {
                score,
                min: scale.min,
                max: scale.max,
            });
        }

        let editing_score = match descriptor.editing_scale() {
            Some(editing_scale) => {
                let value = editing_score.ok_or_else(|| {
                    Error::MissingScore("Please select an editing effect score".to_string())
                })?;
                if !editing_scale.contains(value) {
                    return Err(Error::ScoreOutOfRange {
                        score: value,
                        min: editing_scale.min,
                        max: editing_scale.max,
                    });
                }
                Some(value)
            }
            None => None,
        };

        // Accepted: record raw score plus swap flag (the de-biasing
        // correction happens in the analyzer), advance, reset flags.
        self.responses.push(ResponseRecord::for_trial(
            trial,
            score,
            editing_score,
            &self.url_params,
        ));
        self.cursor += 1;
        self.played.reset();

        if self.is_completed() {
            Ok(SubmitOutcome::Completed(ResultBundle {
                user_id: self.identity.user_id().to_string(),
                timestamp: Utc::now(),
                results: self.responses.clone(),
            }))
        } else {
            Ok(SubmitOutcome::Advanced)
        }
    }
}

/// Token-keyed store of active sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> SessionStore {
        SessionStore {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub async fn insert(&self, session: Session) -> Uuid {
        let id = session.id;
        self.inner.write().await.insert(id, session);
        id
    }

    /// Run a closure against one session under the write lock
    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.inner.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        f(session)
    }

    /// Destroy a session (after persist, or on sweep)
    pub async fn remove(&self, id: Uuid) -> Option<Session> {
        self.inner.write().await.remove(&id)
    }

    /// Drop sessions older than the TTL; returns how many were dropped.
    /// Abandoned sessions leave no persisted bundle.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at() > cutoff);
        before - sessions.len()
    }

    pub async fn active_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
