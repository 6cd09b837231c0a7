use pkg_constants::state::{EXPIRY_SWEEP_INTERVAL_SECS, LEASE_KEY_PREFIX, REBUILD_CLAIM_PREFIX};
use pkg_types::lease::StoredLease;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::StateStore;
use crate::lock::RebuildClaim;

/// Background sweeper that deletes lease records and rebuild claims
/// whose expiry elapsed. Readers already treat elapsed records as
/// not-found; the sweeper reclaims entries nobody reads again.
pub struct ExpiryController {
    store: StateStore,
    sweep_interval: Duration,
}

impl ExpiryController {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            sweep_interval: Duration::from_secs(EXPIRY_SWEEP_INTERVAL_SECS),
        }
    }

    /// Start the sweep loop as a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "ExpiryController started (interval={}s)",
                self.sweep_interval.as_secs()
            );
            let mut interval = tokio::time::interval(self.sweep_interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.reconcile().await {
                    warn!("ExpiryController sweep error: {}", e);
                }
            }
        })
    }

    /// One pass: drop every elapsed lease record and rebuild claim.
    /// Legacy bare-URL entries carry no expiry and are left alone.
    pub async fn reconcile(&self) -> anyhow::Result<()> {
        let leases = self.store.list_prefix(LEASE_KEY_PREFIX).await?;
        for (key, value) in leases {
            let stored: StoredLease = match serde_json::from_slice(&value) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Some(record) = stored.record()
                && record.is_expired()
            {
                info!(
                    "Sweeping expired lease {} (expired {})",
                    record.lease_id, record.expires_at
                );
                self.store.delete(&key).await?;
            }
        }

        let claims = self.store.list_prefix(REBUILD_CLAIM_PREFIX).await?;
        for (key, value) in claims {
            let claim: RebuildClaim = match serde_json::from_slice(&value) {
                Ok(c) => c,
                Err(_) => continue,
            };
            if claim.is_expired() {
                info!("Sweeping expired rebuild claim for {}", claim.lease_id);
                self.store.delete(&key).await?;
            }
        }
        Ok(())
    }
}
