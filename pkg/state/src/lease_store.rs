use pkg_constants::state::LEASE_KEY_PREFIX;
use pkg_types::lease::{LeaseRecord, StoredLease};
use tracing::debug;

use crate::client::StateStore;

/// Typed view over the lease keyspace.
///
/// SlateDB has no native per-key TTL, so the expiration contract is
/// enforced here: a record is only persisted with `expires_at` in the
/// future, and a read past `expires_at` reports not-found and drops the
/// stale entry. The `ExpiryController` sweeps whatever readers never
/// touch again.
#[derive(Clone)]
pub struct LeaseStore {
    store: StateStore,
}

impl LeaseStore {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub fn key(lease_id: &str) -> String {
        format!("{}{}", LEASE_KEY_PREFIX, lease_id)
    }

    /// Persist the full record, arming expiration at its `expires_at`.
    ///
    /// Every caller recomputes `expires_at` as `now + duration` at write
    /// time; a record whose expiry is not strictly in the future is
    /// refused rather than silently persisted.
    pub async fn put(&self, record: &LeaseRecord) -> anyhow::Result<()> {
        if record.expires_at <= record.updated_at {
            anyhow::bail!(
                "refusing to persist lease {} with expires_at {} <= updated_at {}",
                record.lease_id,
                record.expires_at,
                record.updated_at
            );
        }
        let data = serde_json::to_vec(record)?;
        self.store.put(&Self::key(&record.lease_id), &data).await
    }

    /// Current record for a lease id, or `None` when absent or expired.
    /// Legacy bare-URL entries carry no expiry and are returned as-is.
    pub async fn get(&self, lease_id: &str) -> anyhow::Result<Option<StoredLease>> {
        let key = Self::key(lease_id);
        let Some(data) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let stored: StoredLease = match serde_json::from_slice(&data) {
            Ok(s) => s,
            Err(e) => {
                anyhow::bail!("undecodable lease record at {}: {}", key, e);
            }
        };
        if let StoredLease::Record(record) = &stored
            && record.is_expired()
        {
            debug!("Lease {} expired at {}, dropping", lease_id, record.expires_at);
            self.store.delete(&key).await?;
            return Ok(None);
        }
        Ok(Some(stored))
    }

    pub async fn delete(&self, lease_id: &str) -> anyhow::Result<()> {
        self.store.delete(&Self::key(lease_id)).await
    }
}
