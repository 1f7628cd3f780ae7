//! Photo framing service.
//!
//! Accepts a photo, asks a vision model whether it shows a software-related
//! issue, puts it in the matching frame and publishes the result.

pub mod config;
pub mod constants;
pub mod frames;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use frames::FrameSet;
use services::classifier::VerdictClassifier;
use storage::Publisher;

/// Process-wide service handles, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn VerdictClassifier>,
    pub publisher: Arc<dyn Publisher>,
    pub frames: FrameSet,
}

/// Full application router with its middleware stack.
pub fn build_router(state: Arc<AppState>, max_upload_size: usize) -> Router {
    Router::new()
        .merge(routes::build_routes())
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
