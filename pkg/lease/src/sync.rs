use std::time::Duration;
use tracing::debug;

/// Best-effort propagation of a published lease id into the external
/// ownership record (e.g. the owning conversation), so display layers
/// can discover "does this owner already have a published app" without
/// querying the lease store. The lease store stays the source of truth;
/// every failure here is logged by the caller and never interrupts
/// publishing or rebuilding.
#[derive(Clone)]
pub struct RecordSync {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl RecordSync {
    /// `endpoint` is the records service base URL; `None` disables
    /// propagation entirely.
    pub fn new(endpoint: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        })
    }

    /// Write `{published_lease_id}` into the record keyed by `record_id`.
    pub async fn propagate(
        &self,
        record_id: &str,
        lease_id: &str,
        owner_id: &str,
    ) -> anyhow::Result<()> {
        let Some(endpoint) = &self.endpoint else {
            debug!("Records endpoint not configured, skipping ownership sync");
            return Ok(());
        };

        let url = format!("{}/conversations/{}", endpoint, record_id);
        let body = serde_json::json!({
            "published_lease_id": lease_id,
            "owner_id": owner_id,
        });
        let resp = self.client.patch(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("records service answered {}", resp.status());
        }
        debug!("Linked lease {} to record {}", lease_id, record_id);
        Ok(())
    }
}
