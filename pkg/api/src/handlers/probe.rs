use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProbeBody {
    pub url: String,
}

/// POST /api/v1/probe — read-only health check of an environment URL.
///
/// Always answers 200 with the target's state; an unreachable target is
/// `{"alive": false, "status": 0}`, not an error. Only malformed input
/// earns a 4xx (via the Json extractor rejection).
pub async fn probe_liveness(
    State(state): State<AppState>,
    Json(body): Json<ProbeBody>,
) -> impl IntoResponse {
    let probe = state.prober.probe(&body.url).await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "alive": probe.liveness.is_alive(),
            "status": probe.status_code,
        })),
    )
}
