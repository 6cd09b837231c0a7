use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use pkg_types::error::{LeaseError, Result};

use crate::client::{EnvironmentProvider, ProviderContext};

/// Headers the provider expects for team-scoped authorization.
const TEAM_HEADER: &str = "X-Team-Id";
const TOKEN_HEADER: &str = "X-Access-Token";

/// Request timeout for provider control calls.
const PROVIDER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct CreateEnvironmentResponse {
    environment_ref: String,
}

/// HTTP client for the external environment provider's control API.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    /// Domain environments are exposed under:
    /// `https://{port}-{ref}.{domain}`.
    domain: String,
    api_key: Option<String>,
}

impl HttpProvider {
    pub fn new(endpoint: &str, domain: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
            api_key,
        })
    }

    fn authorize(&self, req: RequestBuilder, ctx: &ProviderContext) -> RequestBuilder {
        let mut req = match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        };
        if let (Some(team_id), Some(credential)) = (&ctx.team_id, &ctx.credential) {
            req = req.header(TEAM_HEADER, team_id).header(TOKEN_HEADER, credential);
        }
        req
    }

    /// Send a control request and map failures into the lease taxonomy:
    /// unreachable/timed-out becomes `TransientNetwork`, a rejection from
    /// the provider becomes `Provider`.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                LeaseError::TransientNetwork(format!("{}: {}", what, e))
            } else {
                LeaseError::Provider(format!("{}: {}", what, e))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LeaseError::Provider(format!(
                "{} rejected: {} - {}",
                what, status, body
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl EnvironmentProvider for HttpProvider {
    async fn create_environment(&self, ctx: &ProviderContext) -> Result<String> {
        let url = format!("{}/environments", self.endpoint);
        let req = self.authorize(self.client.post(&url), ctx);
        let resp = self.send(req, "create environment").await?;
        let created: CreateEnvironmentResponse = resp
            .json()
            .await
            .map_err(|e| LeaseError::Provider(format!("create environment response: {}", e)))?;
        info!("Created environment {}", created.environment_ref);
        Ok(created.environment_ref)
    }

    async fn reconnect(&self, environment_ref: &str, ctx: &ProviderContext) -> Result<()> {
        let url = format!("{}/environments/{}/connect", self.endpoint, environment_ref);
        let req = self.authorize(self.client.post(&url), ctx);
        self.send(req, "reconnect").await?;
        Ok(())
    }

    async fn set_timeout(
        &self,
        environment_ref: &str,
        duration: Duration,
        ctx: &ProviderContext,
    ) -> Result<()> {
        let url = format!("{}/environments/{}/timeout", self.endpoint, environment_ref);
        let body = serde_json::json!({ "timeout_secs": duration.as_secs() });
        let req = self.authorize(self.client.post(&url).json(&body), ctx);
        self.send(req, "set timeout").await?;
        info!(
            "Extended environment {} timeout to {}s",
            environment_ref,
            duration.as_secs()
        );
        Ok(())
    }

    async fn write_file(
        &self,
        environment_ref: &str,
        path: &str,
        content: &str,
        ctx: &ProviderContext,
    ) -> Result<()> {
        let url = format!("{}/environments/{}/files", self.endpoint, environment_ref);
        let body = serde_json::json!({ "path": path, "content": content });
        let req = self.authorize(self.client.post(&url).json(&body), ctx);
        self.send(req, "write file").await?;
        Ok(())
    }

    async fn run_command(
        &self,
        environment_ref: &str,
        command: &str,
        ctx: &ProviderContext,
    ) -> Result<()> {
        let url = format!("{}/environments/{}/commands", self.endpoint, environment_ref);
        let body = serde_json::json!({ "command": command });
        let req = self.authorize(self.client.post(&url).json(&body), ctx);
        self.send(req, "run command").await?;
        Ok(())
    }

    fn host_url(&self, environment_ref: &str, port: u16) -> String {
        format!("https://{}-{}.{}", port, environment_ref, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_url_shape() {
        let provider = HttpProvider::new("https://api.sandbox.example/", "sandbox.example", None)
            .unwrap();
        assert_eq!(
            provider.host_url("env-42", 3000),
            "https://3000-env-42.sandbox.example"
        );
        // Trailing slash on the endpoint is normalized away.
        assert_eq!(provider.endpoint, "https://api.sandbox.example");
    }
}
