use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::error_status;
use pkg_constants::lease::DEFAULT_REBUILD_TTL_SECS;
use pkg_lease::publisher::PublishRequest;
use pkg_types::artifact::Artifact;
use pkg_types::lease::{LeaseDuration, LeaseRecord, StoredLease};

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    pub lease_id: String,
    pub environment_ref: String,
    pub public_url: String,
    pub duration: LeaseDuration,
    pub owner_id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub owner_record_id: Option<String>,
}

/// POST /api/v1/leases — publish (or republish) a lease.
pub async fn publish_lease(
    State(state): State<AppState>,
    Json(body): Json<PublishBody>,
) -> impl IntoResponse {
    let req = PublishRequest {
        lease_id: body.lease_id,
        environment_ref: body.environment_ref,
        public_url: body.public_url,
        duration: body.duration,
        owner_id: body.owner_id,
        team_id: body.team_id,
        credential: body.credential,
        artifact: body.artifact,
        owner_record_id: body.owner_record_id,
    };
    match state.publisher.publish(req).await {
        Ok(url) => (StatusCode::OK, Json(serde_json::json!({ "url": url }))).into_response(),
        Err(e) => {
            warn!("Publish failed: {}", e);
            (
                error_status(&e),
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /api/v1/leases/{id} — current record for the resolving path.
pub async fn read_lease(
    State(state): State<AppState>,
    AxumPath(lease_id): AxumPath<String>,
) -> impl IntoResponse {
    match state.leases.get(&lease_id).await {
        Ok(Some(StoredLease::Record(record))) => (StatusCode::OK, Json(record)).into_response(),
        // URL-only entries from before artifact storage: all we can
        // report is the URL itself.
        Ok(Some(StoredLease::Legacy(url))) => (
            StatusCode::OK,
            Json(serde_json::json!({ "lease_id": lease_id, "public_url": url })),
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("Failed to read lease {}: {}", lease_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeaseBody {
    pub new_url: String,
    pub new_environment_ref: String,
}

/// PUT /api/v1/leases/{id} — repoint a lease after an externally driven
/// rebuild. Refuses when no record exists; recomputes and re-arms the
/// expiry rather than defaulting to "no expiration".
pub async fn update_lease(
    State(state): State<AppState>,
    AxumPath(lease_id): AxumPath<String>,
    Json(body): Json<UpdateLeaseBody>,
) -> impl IntoResponse {
    let existing = match state.leases.get(&lease_id).await {
        Ok(Some(StoredLease::Record(record))) => record,
        Ok(Some(StoredLease::Legacy(_))) | Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "lease not found or not updatable" })),
            )
                .into_response();
        }
        Err(e) => {
            warn!("Failed to read lease {}: {}", lease_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let now = Utc::now();
    let updated = LeaseRecord {
        environment_ref: body.new_environment_ref,
        public_url: body.new_url,
        created_at: now,
        updated_at: now,
        expires_at: now + chrono::Duration::seconds(DEFAULT_REBUILD_TTL_SECS as i64),
        ..existing
    };
    if let Err(e) = state.leases.put(&updated).await {
        warn!("Failed to update lease {}: {}", lease_id, e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    info!(
        "Updated lease {} to environment {}",
        lease_id, updated.environment_ref
    );
    (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response()
}
