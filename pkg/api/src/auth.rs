use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::AppState;

/// Middleware: authenticates mutating API requests using a Bearer token.
/// The viewer-facing routes (`/app/{id}`, the probe endpoint) stay
/// public and never pass through here.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req.headers().get(header::AUTHORIZATION);

    let token = match auth_header {
        Some(value) => {
            let value_str = value.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
            if !value_str.starts_with("Bearer ") {
                return Err(StatusCode::UNAUTHORIZED);
            }
            value_str.trim_start_matches("Bearer ").to_string()
        }
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    if token == state.api_token {
        Ok(next.run(req).await)
    } else {
        warn!("Invalid Bearer token provided");
        Err(StatusCode::UNAUTHORIZED)
    }
}
