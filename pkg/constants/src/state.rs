//! State store key layout and sweep tuning.

/// etcd-style key prefix for published lease records.
pub const LEASE_KEY_PREFIX: &str = "/registry/leases/";

/// Key prefix for in-flight rebuild claims, one per lease id.
pub const REBUILD_CLAIM_PREFIX: &str = "/registry/rebuilds/";

/// How often the expiry sweeper scans for elapsed records, in seconds.
pub const EXPIRY_SWEEP_INTERVAL_SECS: u64 = 60;
