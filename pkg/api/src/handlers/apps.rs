use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use tracing::warn;

use crate::AppState;

/// GET /app/{id} — the public, shareable face of a lease.
///
/// Resolves the stable lease path to whatever environment currently
/// backs it. Legacy URL-only entries redirect as-is; expired or unknown
/// ids are gone.
pub async fn resolve_app(
    State(state): State<AppState>,
    AxumPath(lease_id): AxumPath<String>,
) -> impl IntoResponse {
    match state.leases.get(&lease_id).await {
        Ok(Some(stored)) => Redirect::temporary(stored.public_url()).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "app not found").into_response(),
        Err(e) => {
            warn!("Failed to resolve app {}: {}", lease_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
