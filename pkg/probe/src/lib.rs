//! Read-only liveness probing of environment URLs.
//!
//! The prober holds no session for the target and must never mistake
//! its own trouble for the target's: local transport problems classify
//! as `Unknown` and fail open, so a broken resolver here cannot set off
//! a rebuild storm against healthy environments.

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use pkg_constants::probe::{DEAD_ENVIRONMENT_MARKER, PROBE_TIMEOUT_SECS};

/// Tri-state probe classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The environment answered and the body looks like a live app.
    Alive,
    /// The environment is gone: error status, dead-page marker, or the
    /// network said so.
    Dead,
    /// The probe itself misfired locally. No verdict on the target.
    Unknown,
}

impl Liveness {
    /// Collapse to the boolean callers consume. `Unknown` counts as
    /// alive (fail open).
    pub fn is_alive(&self) -> bool {
        !matches!(self, Liveness::Dead)
    }
}

/// Outcome of one probe. `status_code` is 0 when no HTTP response
/// arrived at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub liveness: Liveness,
    pub status_code: u16,
}

/// Classify an HTTP answer. Kept free of I/O so the decision table is
/// directly testable.
///
/// Some providers answer requests for a torn-down environment with
/// HTTP 200 and an HTML error page rather than a 4xx/5xx status; the
/// marker sniff catches those.
pub fn classify(status: u16, content_type: Option<&str>, body: Option<&str>) -> Liveness {
    if status >= 400 {
        return Liveness::Dead;
    }
    if content_type.is_some_and(|ct| ct.starts_with("text/"))
        && body.is_some_and(|b| b.contains(DEAD_ENVIRONMENT_MARKER))
    {
        return Liveness::Dead;
    }
    Liveness::Alive
}

/// Issues probes with caching disabled and no credential forwarding.
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Probe `url`. Never returns an error: every failure mode folds
    /// into the tri-state result.
    pub async fn probe(&self, url: &str) -> Probe {
        let resp = match self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                // A request that never formed is our problem, not the
                // target's; anything that went out and failed is a
                // target-down signal.
                let liveness = if e.is_builder() {
                    Liveness::Unknown
                } else {
                    Liveness::Dead
                };
                debug!("Probe of {} failed: {} ({:?})", url, e, liveness);
                return Probe {
                    liveness,
                    status_code: 0,
                };
            }
        };

        let status = resp.status().as_u16();
        if status >= 400 {
            return Probe {
                liveness: Liveness::Dead,
                status_code: status,
            };
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let needs_body_sniff = content_type.as_deref().is_some_and(|ct| ct.starts_with("text/"));
        let body = if needs_body_sniff {
            match resp.text().await {
                Ok(text) => Some(text),
                // The connection died mid-body: target-down.
                Err(_) => {
                    return Probe {
                        liveness: Liveness::Dead,
                        status_code: status,
                    };
                }
            }
        } else {
            None
        };

        Probe {
            liveness: classify(status, content_type.as_deref(), body.as_deref()),
            status_code: status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_is_dead() {
        assert_eq!(classify(503, None, None), Liveness::Dead);
        assert_eq!(classify(404, Some("text/html"), Some("gone")), Liveness::Dead);
        assert_eq!(classify(400, None, None), Liveness::Dead);
    }

    #[test]
    fn test_ok_status_is_alive() {
        assert_eq!(classify(200, None, None), Liveness::Alive);
        assert_eq!(
            classify(200, Some("application/json"), Some(r#"{"users": []}"#)),
            Liveness::Alive
        );
        assert_eq!(classify(302, Some("text/html"), Some("<a>moved</a>")), Liveness::Alive);
    }

    #[test]
    fn test_dead_marker_overrides_ok_status() {
        let body = "<html><body><h1>Sandbox Not Found</h1></body></html>";
        assert_eq!(classify(200, Some("text/html"), Some(body)), Liveness::Dead);
        assert_eq!(
            classify(200, Some("text/html; charset=utf-8"), Some(body)),
            Liveness::Dead
        );
    }

    #[test]
    fn test_marker_in_non_text_body_is_ignored() {
        // A JSON app that happens to echo the marker string is not a dead page.
        let body = r#"{"message": "Sandbox Not Found"}"#;
        assert_eq!(classify(200, Some("application/json"), Some(body)), Liveness::Alive);
    }

    #[test]
    fn test_unknown_fails_open() {
        assert!(Liveness::Unknown.is_alive());
        assert!(Liveness::Alive.is_alive());
        assert!(!Liveness::Dead.is_alive());
    }

    #[tokio::test]
    async fn test_connection_refused_is_dead() {
        let prober = Prober::new().unwrap();
        // Port 9 (discard) is not listening on loopback.
        let probe = prober.probe("http://127.0.0.1:9/").await;
        assert_eq!(probe.liveness, Liveness::Dead);
        assert_eq!(probe.status_code, 0);
    }
}
