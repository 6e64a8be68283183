use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::db::entities::watchdog_entry;
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn get_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Path((namespace, id)): Path<(String, String)>,
) -> Result<Json<watchdog_entry::Model>, AppError> {
    let entry = app_state.checkin_service.get(&namespace, &id).await?;
    Ok(Json(entry))
}

async fn checkin_handler(
    State(app_state): State<Arc<AppState>>,
    Path((namespace, id)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<watchdog_entry::Model>, AppError> {
    let limit = app_state.checkin_service.max_payload_bytes();
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!(
                "The body must not exceed {limit} bytes in length."
            ))
        } else {
            AppError::InvalidInput(rejection.body_text())
        }
    })?;
    app_state.checkin_service.check_payload_size(body.len())?;

    // An empty body checks in without data.
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&body)?
    };

    let entry = app_state
        .checkin_service
        .checkin(&namespace, &id, payload)
        .await?;
    Ok(Json(entry))
}

// --- Router ---

pub fn create_checkin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{namespace}/{id}", get(get_entry_handler).post(checkin_handler))
        .route("/{namespace}/{id}/", get(get_entry_handler).post(checkin_handler))
}
