use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pkg_provider::{EnvironmentProvider, ProviderContext};
use pkg_state::lease_store::LeaseStore;
use pkg_types::artifact::Artifact;
use pkg_types::error::Result;
use pkg_types::lease::{LeaseDuration, LeaseRecord};

use crate::store_err;
use crate::sync::RecordSync;

/// Everything a caller supplies to turn a running environment into a
/// published lease.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub lease_id: String,
    /// The already-running environment to publish.
    pub environment_ref: String,
    /// URL currently serving that environment.
    pub public_url: String,
    pub duration: LeaseDuration,
    pub owner_id: String,
    pub team_id: Option<String>,
    pub credential: Option<String>,
    /// Needed for future rebuilds; a lease published without one can
    /// never self-heal.
    pub artifact: Option<Artifact>,
    /// Durable record (e.g. owning conversation) to link the lease to.
    pub owner_record_id: Option<String>,
}

/// Turns running environments into published leases.
pub struct Publisher {
    leases: LeaseStore,
    provider: Arc<dyn EnvironmentProvider>,
    sync: RecordSync,
    base_url: String,
}

impl Publisher {
    pub fn new(
        leases: LeaseStore,
        provider: Arc<dyn EnvironmentProvider>,
        sync: RecordSync,
        base_url: &str,
    ) -> Self {
        Self {
            leases,
            provider,
            sync,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The shareable URL for a lease: a stable path keyed by id, distinct
    /// from the raw environment URL so rebuilds can swap the backing
    /// environment without changing the link.
    pub fn lease_url(&self, lease_id: &str) -> String {
        format!("{}/app/{}", self.base_url, lease_id)
    }

    /// Publish (or republish) a lease. Idempotent per lease id: a
    /// republish overwrites the prior record wholesale.
    pub async fn publish(&self, req: PublishRequest) -> Result<String> {
        let ctx = ProviderContext::new(req.team_id.clone(), req.credential.clone());

        // Extend the environment first. A lease whose backing environment
        // was not correspondingly extended must not be persisted, so this
        // failure is fatal to publishing.
        self.provider
            .set_timeout(
                &req.environment_ref,
                Duration::from_secs(req.duration.as_secs()),
                &ctx,
            )
            .await?;

        let now = Utc::now();
        let record = LeaseRecord {
            lease_id: req.lease_id.clone(),
            environment_ref: req.environment_ref,
            public_url: req.public_url,
            artifact: req.artifact,
            owner_id: req.owner_id.clone(),
            team_id: req.team_id,
            credential: req.credential,
            created_at: now,
            updated_at: now,
            expires_at: now + req.duration.as_chrono(),
        };
        self.leases.put(&record).await.map_err(store_err)?;
        info!(
            "Published lease {} (environment {}, duration {})",
            req.lease_id, record.environment_ref, req.duration
        );

        // Ownership linkage is a convenience index, not the source of
        // truth: log and continue on failure.
        if let Some(owner_record_id) = &req.owner_record_id
            && let Err(e) = self
                .sync
                .propagate(owner_record_id, &req.lease_id, &req.owner_id)
                .await
        {
            warn!(
                "Failed to link lease {} to record {}: {}",
                req.lease_id, owner_record_id, e
            );
        }

        Ok(self.lease_url(&req.lease_id))
    }
}
