use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::models::ApiError;

pub const API_KEY_ENV: &str = "INQ_API_KEY";

/// Gate for /api/*: only enforced when INQ_API_KEY is set and non-empty
pub async fn require_api_key(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let expected = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());

    let Some(expected) = expected else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    match check_key(&expected, provided) {
        Ok(()) => Ok(next.run(request).await),
        Err(message) => Err(ApiError::new(StatusCode::UNAUTHORIZED, message)),
    }
}

fn check_key(expected: &str, provided: Option<&str>) -> Result<(), &'static str> {
    match provided {
        Some(key) if key == expected => Ok(()),
        Some(_) => Err("Invalid API key"),
        None => Err("Missing X-API-Key header"),
    }
}
