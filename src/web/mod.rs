use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::checkin_service::CheckinService;

pub use crate::web::error::AppError;

pub mod error;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub checkin_service: Arc<CheckinService>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(checkin_service: Arc<CheckinService>) -> Router {
    let body_limit = checkin_service.max_payload_bytes();
    let app_state = Arc::new(AppState { checkin_service });

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(
            routes::checkin_routes::create_checkin_router()
                .route_layer(axum_middleware::from_fn(middleware::require_json::require_json)),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
