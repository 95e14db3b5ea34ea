use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::aggregator::Aggregator;
use crate::fetcher::PageFetcher;
use crate::settings::Settings;

pub mod errors;
pub mod handlers;
pub mod models;

pub struct AppState {
    pub aggregator: Aggregator<PageFetcher>,
    pub settings: Arc<Settings>,
    /// Ceiling for a request's max pages.
    pub max_pages: u32,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/search", post(handlers::search_handler))
        .route("/api/settings/reload", post(handlers::reload_settings_handler))
        .route(
            "/api/settings/:store",
            get(handlers::list_settings_handler).post(handlers::update_settings_handler),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
