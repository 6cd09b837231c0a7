use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// Allowed publish durations. A closed set so callers cannot request
/// unbounded leases; anything else is rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseDuration {
    Short,
    Medium,
    Long,
}

impl LeaseDuration {
    pub fn as_secs(&self) -> u64 {
        match self {
            LeaseDuration::Short => pkg_constants::lease::SHORT_LEASE_SECS,
            LeaseDuration::Medium => pkg_constants::lease::MEDIUM_LEASE_SECS,
            LeaseDuration::Long => pkg_constants::lease::LONG_LEASE_SECS,
        }
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.as_secs() as i64)
    }
}

impl std::fmt::Display for LeaseDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaseDuration::Short => write!(f, "short"),
            LeaseDuration::Medium => write!(f, "medium"),
            LeaseDuration::Long => write!(f, "long"),
        }
    }
}

/// The unit of truth for a published app.
/// Stored at `/registry/leases/<lease-id>` in SlateDB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Opaque public identifier, caller-supplied.
    pub lease_id: String,
    /// The execution environment currently backing this lease.
    pub environment_ref: String,
    /// URL serving that environment right now. Replaced together with
    /// `environment_ref` on every rebuild, never one without the other.
    pub public_url: String,
    /// Descriptor for recreating the environment. Absent on records that
    /// predate artifact storage; such leases can never be rebuilt.
    #[serde(default)]
    pub artifact: Option<Artifact>,
    pub owner_id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    /// Opaque provider authorization token. Never logged.
    #[serde(default)]
    pub credential: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Always recomputed as `write time + duration` on every write.
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// Check if this lease has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// What actually sits at a lease key. Early deployments stored only the
/// bare environment URL as a JSON string; everything since stores the
/// full record. Resolved once at the read boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredLease {
    Record(LeaseRecord),
    Legacy(String),
}

impl StoredLease {
    /// The URL currently serving this lease, whatever the stored shape.
    pub fn public_url(&self) -> &str {
        match self {
            StoredLease::Record(record) => &record.public_url,
            StoredLease::Legacy(url) => url,
        }
    }

    pub fn record(&self) -> Option<&LeaseRecord> {
        match self {
            StoredLease::Record(record) => Some(record),
            StoredLease::Legacy(_) => None,
        }
    }
}
