//! Liveness probe tuning.

/// Request timeout for a single liveness probe, in seconds.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Some providers answer requests for a torn-down environment with
/// HTTP 200 and an HTML error page carrying this marker instead of a
/// 4xx/5xx status.
pub const DEAD_ENVIRONMENT_MARKER: &str = "Sandbox Not Found";
