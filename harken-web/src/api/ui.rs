//! UI serving routes
//!
//! Serves the static HTML/JS rating form and the optional deployment
//! stylesheet

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::AppState;

const INDEX_HTML: &str = include_str!("../ui/index.html");
const APP_JS: &str = include_str!("../ui/app.js");

/// GET /
///
/// Serves the rating form page
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/app.js
///
/// Serves the JavaScript application
pub async fn serve_app_js() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/javascript")],
        APP_JS,
    )
        .into_response()
}

/// GET /static/custom.css
///
/// Serves the configured deployment stylesheet, or an empty sheet when
/// none is configured.
pub async fn serve_custom_css(State(state): State<AppState>) -> Response {
    let css = match &state.config.paths.css_file {
        Some(path) => tokio::fs::read_to_string(path).await.unwrap_or_default(),
        None => String::new(),
    };
    (StatusCode::OK, [("content-type", "text/css")], css).into_response()
}
