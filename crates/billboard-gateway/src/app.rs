use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{ads_handler, health_handler, short_handler};
use crate::state::AppState;

pub const HEALTH_PATH: &str = "/-/health";

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(ads_handler))
            // Two segments, so no shortlink code can shadow it.
            .route(HEALTH_PATH, get(health_handler))
            .route("/{short}", get(short_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
