use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use crate::AppState;
use crate::handlers::error_status;

/// POST /api/v1/leases/{id}/rebuild — replace a dead environment from
/// the stored artifact and repoint the lease. A rebuild failure is
/// always reported to the caller, never swallowed: the viewer needs to
/// know whether to show a retry affordance or the restored app.
pub async fn rebuild_lease(
    State(state): State<AppState>,
    AxumPath(lease_id): AxumPath<String>,
) -> impl IntoResponse {
    match state.reconciler.rebuild(&lease_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "url": outcome.public_url,
                "environment_ref": outcome.environment_ref,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!("Rebuild of lease {} failed: {}", lease_id, e);
            (
                error_status(&e),
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
