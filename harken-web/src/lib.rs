//! harken-web library - the rating web service
//!
//! Serves the rating UI, walks each participant session through its sampled
//! trial sequence, and persists one result bundle per completed session.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

use harken_common::catalog::Catalog;
use harken_common::config::AppConfig;

use crate::descriptor::DescriptorRegistry;
use crate::persist::ResultPersister;
use crate::session::SessionStore;

pub mod api;
pub mod descriptor;
pub mod persist;
pub mod sampler;
pub mod session;

/// Application state shared across HTTP handlers
///
/// Everything here is read-only after startup except the session store,
/// which is keyed per session token. Per-session data (trial sequence,
/// cursor, responses, played flags) never lives in process-wide fields.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    pub registry: Arc<DescriptorRegistry>,
    pub sessions: SessionStore,
    pub persister: ResultPersister,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: Catalog, registry: DescriptorRegistry) -> Self {
        let sessions = SessionStore::new(config.test.session_ttl_secs);
        let persister = ResultPersister::new(config.paths.results_dir.clone());
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            registry: Arc::new(registry),
            sessions,
            persister,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let audio_root = state.config.paths.audio_root.clone();

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/static/custom.css", get(api::serve_custom_css))
        .merge(api::health_routes())
        .route("/api/session", post(api::start_session))
        .route("/api/session/:id", get(api::get_session))
        .route("/api/session/:id/played", post(api::mark_played))
        .route("/api/session/:id/submit", post(api::submit_score))
        .nest_service("/audio", ServeDir::new(audio_root))
        .with_state(state)
}
