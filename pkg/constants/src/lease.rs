//! Lease duration presets and rebuild tuning.

/// The `short` publish preset, in seconds (30 minutes).
pub const SHORT_LEASE_SECS: u64 = 30 * 60;

/// The `medium` publish preset, in seconds (3 hours).
pub const MEDIUM_LEASE_SECS: u64 = 3 * 60 * 60;

/// The `long` publish preset, in seconds (24 hours).
pub const LONG_LEASE_SECS: u64 = 24 * 60 * 60;

/// Every rebuild grants this fixed duration, regardless of the
/// duration the original publish requested.
pub const DEFAULT_REBUILD_TTL_SECS: u64 = 24 * 60 * 60;

/// How long a rebuild claim is valid before a crashed holder is
/// considered gone and the claim can be taken over.
pub const REBUILD_CLAIM_TTL_SECS: u64 = 120;

/// Poll interval while waiting on another caller's in-flight rebuild,
/// in milliseconds.
pub const REBUILD_WAIT_POLL_MS: u64 = 500;

/// Give up waiting on another caller's rebuild after this long, in seconds.
pub const REBUILD_WAIT_MAX_SECS: u64 = 90;
