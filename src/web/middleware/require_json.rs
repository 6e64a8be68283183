use axum::{
    body::Body as AxumBody,
    http::{HeaderMap, Method, Request, header},
    middleware::Next,
    response::Response,
};

use crate::web::error::AppError;

/// Rejects clients that cannot read JSON and writes that are not JSON.
pub async fn require_json(req: Request<AxumBody>, next: Next) -> Result<Response, AppError> {
    if !client_accepts_json(req.headers()) {
        return Err(AppError::NotAcceptable(
            "This API only supports responses encoded as JSON.".to_string(),
        ));
    }

    if matches!(*req.method(), Method::POST | Method::PUT) && !is_json_content(req.headers()) {
        return Err(AppError::UnsupportedMediaType(
            "This API only supports requests encoded as JSON.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

fn client_accepts_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return true;
    };
    let Ok(accept) = accept.to_str() else {
        return false;
    };
    accept.split(',').any(|range| {
        let media_type = range.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        matches!(media_type.as_str(), "application/json" | "application/*" | "*/*")
            || media_type.ends_with("+json")
    })
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}
