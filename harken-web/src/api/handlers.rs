//! Session API: start, trial views, playback notifications, submissions
//!
//! Each handler operates on explicit session-scoped state looked up by
//! token; recoverable submission problems come back as `rejected` payloads
//! that re-present the same trial, never as state changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use harken_common::error::Error;
use harken_common::identity::Identity;
use harken_common::results::ResultBundle;
use harken_common::scale::{RatingScale, ScoreChoice};
use harken_common::trial::TrialSpec;

use crate::sampler::{sample_session, SamplerPolicy};
use crate::session::{AudioSlot, Session, SubmitOutcome};
use crate::AppState;

// =============================================================================
// View types
// =============================================================================

/// Rating scale as presented to the UI: structural options, never a
/// "value: label" display string.
#[derive(Debug, Serialize)]
pub struct ScaleView {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub options: Vec<ScoreChoice>,
}

impl From<&RatingScale> for ScaleView {
    fn from(scale: &RatingScale) -> Self {
        ScaleView {
            min: scale.min,
            max: scale.max,
            default: scale.default,
            options: scale.options(),
        }
    }
}

/// One trial as presented to the UI. System labels are deliberately absent.
#[derive(Debug, Serialize)]
pub struct TrialView {
    pub index: usize,
    pub total: usize,
    pub test_type: String,
    pub is_instruction: bool,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<String>,
    pub target_audio: String,
    pub scale: ScaleView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_scale: Option<ScaleView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

fn progress_view(completed: usize, total: usize) -> ProgressView {
    let percent = if total == 0 {
        100
    } else {
        (completed * 100 / total) as u32
    };
    ProgressView {
        completed,
        total,
        percent,
    }
}

fn audio_url(path: &str) -> String {
    format!("/audio/{}", path.trim_start_matches('/'))
}

fn trial_view(
    state: &AppState,
    trial: &TrialSpec,
    index: usize,
    total: usize,
) -> Result<TrialView, Error> {
    let descriptor = state.registry.create(trial)?;
    let reference_audio = if descriptor.needs_reference_audio() {
        trial.effective_reference().map(audio_url)
    } else {
        None
    };
    Ok(TrialView {
        index,
        total,
        test_type: trial.test_type.to_string(),
        is_instruction: trial.test_type.is_instruction(),
        instructions: descriptor.instructions(),
        reference_audio,
        target_audio: audio_url(&trial.target),
        scale: ScaleView::from(descriptor.rating_scale()),
        editing_scale: descriptor.editing_scale().map(ScaleView::from),
        edited_transcript: descriptor.edited_transcript().map(String::from),
    })
}

// =============================================================================
// POST /api/session
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    /// Query parameters of the entry URL, passed through by the UI.
    /// A `PROLIFIC_PID` key auto-identifies the participant.
    #[serde(default)]
    pub url_params: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub user_id: String,
    pub is_external: bool,
    pub total: usize,
    pub trial: TrialView,
    pub progress: ProgressView,
}

/// Start a fresh session: validate identity, draw a fresh trial sample,
/// return the first trial. Every page load starts over; sessions are not
/// resumable.
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let swept = state.sessions.sweep_expired().await;
    if swept > 0 {
        info!(swept, "swept abandoned sessions");
    }

    if let Some(cap) = state.config.test.max_participants {
        if state.persister.bundle_count() >= cap {
            return Err(ApiError::ParticipantCap(
                "The maximum number of participants has been reached. \
                 Thank you for your interest!"
                    .to_string(),
            ));
        }
    }

    let identity = match request
        .url_params
        .get("PROLIFIC_PID")
        .filter(|v| !v.is_empty())
    {
        Some(pid) => Identity::External(pid.clone()),
        None => Identity::from_submission(
            request.email.as_deref(),
            request.participant_id.as_deref(),
        )?,
    };

    let trials = {
        let policy = SamplerPolicy::from(&state.config.test);
        let mut rng = rand::thread_rng();
        sample_session(
            &state.catalog,
            &policy,
            &state.config.instruction_trials,
            &state.config.attention_pool,
            &mut rng,
        )
    };
    if trials.is_empty() {
        return Err(ApiError::Internal(
            "catalog produced an empty session".to_string(),
        ));
    }

    let total = trials.len();
    let first = trial_view(&state, &trials[0], 0, total)?;
    let user_id = identity.user_id().to_string();
    let is_external = identity.is_external();

    let session = Session::start(identity, request.url_params, trials);
    let session_id = state.sessions.insert(session).await;
    info!(%session_id, %user_id, total, "session started");

    Ok(Json(StartSessionResponse {
        session_id,
        user_id,
        is_external,
        total,
        trial: first,
        progress: progress_view(0, total),
    }))
}

// =============================================================================
// GET /api/session/:id
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub progress: ProgressView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial: Option<TrialView>,
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let (trial, completed, total) = state
        .sessions
        .with_session(id, |s| {
            Ok((s.current_trial().cloned(), s.completed_trials(), s.total_trials()))
        })
        .await?;

    let trial = trial
        .map(|t| trial_view(&state, &t, completed, total))
        .transpose()?;

    Ok(Json(SessionView {
        session_id: id,
        progress: progress_view(completed, total),
        trial,
    }))
}

// =============================================================================
// POST /api/session/:id/played
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PlayedRequest {
    pub slot: AudioSlot,
}

/// Playback-finished notification for one audio slot. Event-driven: nothing
/// blocks waiting on audio, and there is no submission timeout.
pub async fn mark_played(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PlayedRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .sessions
        .with_session(id, |s| {
            s.mark_played(request.slot);
            Ok(())
        })
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

// =============================================================================
// POST /api/session/:id/submit
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub editing_score: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitResponse {
    /// Precondition failed; same trial re-presented, nothing recorded
    Rejected {
        message: String,
        progress: ProgressView,
    },
    /// Response recorded, next trial ready
    Advanced {
        trial: TrialView,
        progress: ProgressView,
    },
    /// Session finished and persisted
    Completed {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        redirect_url: Option<String>,
        progress: ProgressView,
    },
}

enum SubmitStep {
    Rejected {
        message: String,
        completed: usize,
        total: usize,
    },
    Advanced {
        trial: TrialSpec,
        completed: usize,
        total: usize,
    },
    Completed {
        bundle: ResultBundle,
        is_external: bool,
        total: usize,
    },
}

fn guidance_message(error: &Error) -> String {
    match error {
        Error::IncompletePlayback(message) | Error::MissingScore(message) => message.clone(),
        Error::ScoreOutOfRange { score, min, max } => {
            format!("Score {score} is outside the allowed range [{min}, {max}]")
        }
        other => other.to_string(),
    }
}

pub async fn submit_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let step = state
        .sessions
        .with_session(id, |s| {
            match s.submit(&registry, request.score, request.editing_score) {
                Ok(SubmitOutcome::Advanced) => {
                    let trial = s.current_trial().cloned().ok_or_else(|| {
                        Error::Internal("advanced past final trial".to_string())
                    })?;
                    Ok(SubmitStep::Advanced {
                        trial,
                        completed: s.completed_trials(),
                        total: s.total_trials(),
                    })
                }
                Ok(SubmitOutcome::Completed(bundle)) => Ok(SubmitStep::Completed {
                    bundle,
                    is_external: s.identity.is_external(),
                    total: s.total_trials(),
                }),
                Err(error) if error.is_recoverable() => Ok(SubmitStep::Rejected {
                    message: guidance_message(&error),
                    completed: s.completed_trials(),
                    total: s.total_trials(),
                }),
                Err(error) => Err(error),
            }
        })
        .await?;

    match step {
        SubmitStep::Rejected {
            message,
            completed,
            total,
        } => Ok(Json(SubmitResponse::Rejected {
            message,
            progress: progress_view(completed, total),
        })),
        SubmitStep::Advanced {
            trial,
            completed,
            total,
        } => Ok(Json(SubmitResponse::Advanced {
            trial: trial_view(&state, &trial, completed, total)?,
            progress: progress_view(completed, total),
        })),
        SubmitStep::Completed {
            bundle,
            is_external,
            total,
        } => {
            // The session is destroyed either way; a failed write is fatal
            // to it and surfaced, never retried.
            let persisted = state.persister.persist(&bundle);
            state.sessions.remove(id).await;
            if let Err(error) = persisted {
                warn!(%id, %error, "failed to persist result bundle");
                return Err(error.into());
            }

            let redirect_url = is_external.then(|| state.config.completion.redirect_url());
            Ok(Json(SubmitResponse::Completed {
                message: "Test completed! Thank you for participating! \
                          Your results have been saved."
                    .to_string(),
                redirect_url,
                progress: progress_view(total, total),
            }))
        }
    }
}

// =============================================================================
// API errors
// =============================================================================

/// Session API errors
#[derive(Debug)]
pub enum ApiError {
    InvalidIdentity(String),
    ParticipantCap(String),
    NotFound(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidIdentity(message) => ApiError::InvalidIdentity(message),
            Error::SessionNotFound(message) => ApiError::NotFound(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidIdentity(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::ParticipantCap(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, format!("Session not found: {message}"))
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
