use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::StateStore;

use pkg_constants::lease::REBUILD_CLAIM_TTL_SECS;
use pkg_constants::state::REBUILD_CLAIM_PREFIX;

/// Exclusive marker for an in-flight rebuild of one lease.
///
/// Two viewers can notice a dead environment at the same moment; only
/// the claim holder actually builds a replacement. The TTL bounds how
/// long a crashed holder can block the lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildClaim {
    pub lease_id: String,
    pub holder_id: String,
    pub acquired_at: chrono::DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl RebuildClaim {
    pub fn is_expired(&self) -> bool {
        let expiry = self.acquired_at + chrono::Duration::seconds(self.ttl_seconds as i64);
        Utc::now() > expiry
    }
}

/// Store-backed claim operations, keyed per lease id.
#[derive(Clone)]
pub struct RebuildLock {
    store: StateStore,
}

impl RebuildLock {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    fn key(lease_id: &str) -> String {
        format!("{}{}", REBUILD_CLAIM_PREFIX, lease_id)
    }

    /// Try to claim the rebuild of `lease_id` for `holder_id`.
    /// Returns false when another live holder already owns it.
    pub async fn try_acquire(&self, lease_id: &str, holder_id: &str) -> anyhow::Result<bool> {
        let key = Self::key(lease_id);

        if let Some(data) = self.store.get(&key).await? {
            let claim: RebuildClaim = serde_json::from_slice(&data)?;
            if claim.holder_id != holder_id && !claim.is_expired() {
                return Ok(false);
            }
            if claim.is_expired() {
                info!(
                    "Rebuild claim for {} expired (held by {}), taking over for {}",
                    lease_id, claim.holder_id, holder_id
                );
            }
        }

        let claim = RebuildClaim {
            lease_id: lease_id.to_string(),
            holder_id: holder_id.to_string(),
            acquired_at: Utc::now(),
            ttl_seconds: REBUILD_CLAIM_TTL_SECS,
        };
        let data = serde_json::to_vec(&claim)?;
        self.store.put(&key, &data).await?;
        Ok(true)
    }

    /// Whether any live holder currently claims this lease's rebuild.
    pub async fn held(&self, lease_id: &str) -> anyhow::Result<bool> {
        match self.store.get(&Self::key(lease_id)).await? {
            Some(data) => {
                let claim: RebuildClaim = serde_json::from_slice(&data)?;
                Ok(!claim.is_expired())
            }
            None => Ok(false),
        }
    }

    /// Release the claim, but only if `holder_id` still owns it.
    pub async fn release(&self, lease_id: &str, holder_id: &str) -> anyhow::Result<()> {
        let key = Self::key(lease_id);
        if let Some(data) = self.store.get(&key).await? {
            let claim: RebuildClaim = serde_json::from_slice(&data)?;
            if claim.holder_id == holder_id {
                self.store.delete(&key).await?;
            }
        }
        Ok(())
    }
}
