use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::error_status;
use pkg_provider::ProviderContext;
use pkg_types::artifact::Artifact;
use pkg_types::error::LeaseError;

#[derive(Debug, Deserialize)]
pub struct SyncBody {
    pub artifact: Artifact,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// POST /api/v1/environments/{ref}/sync — push a fresh artifact into a
/// *live* environment: reconnect, install newly declared dependencies,
/// rewrite the files. This is how edits reach a running app without a
/// rebuild; a dead environment cannot take this path.
pub async fn sync_environment(
    State(state): State<AppState>,
    AxumPath(environment_ref): AxumPath<String>,
    Json(body): Json<SyncBody>,
) -> impl IntoResponse {
    let ctx = ProviderContext::new(body.team_id, body.credential);

    let result = async {
        state.provider.reconnect(&environment_ref, &ctx).await?;

        if body.artifact.has_additional_dependencies()
            && let Some(install_command) = &body.artifact.install_command
        {
            state
                .provider
                .run_command(&environment_ref, install_command, &ctx)
                .await?;
            info!(
                "Installed dependencies [{}] in environment {}",
                body.artifact.dependencies.join(", "),
                environment_ref
            );
        }

        for file in &body.artifact.files {
            state
                .provider
                .write_file(&environment_ref, &file.path, &file.content, &ctx)
                .await
                .map_err(|e| LeaseError::FileWrite {
                    path: file.path.clone(),
                    reason: e.to_string(),
                })?;
            info!("Updated file {} in {}", file.path, environment_ref);
        }

        Ok::<_, LeaseError>(state.provider.host_url(&environment_ref, body.artifact.port))
    }
    .await;

    match result {
        Ok(url) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "environment_ref": environment_ref,
                "url": url,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to sync environment {}: {}", environment_ref, e);
            (
                error_status(&e),
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
