//! HTTP API handlers for harken-web

pub mod handlers;
pub mod health;
pub mod ui;

pub use handlers::{get_session, mark_played, start_session, submit_score};
pub use health::health_routes;
pub use ui::{serve_app_js, serve_custom_css, serve_index};
