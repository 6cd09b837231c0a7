use async_trait::async_trait;
use std::time::Duration;

use pkg_types::error::Result;

/// Authorization context forwarded on every provider call.
/// Both fields are optional; personal environments carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderContext {
    pub team_id: Option<String>,
    /// Opaque provider credential. Never logged.
    pub credential: Option<String>,
}

impl ProviderContext {
    pub fn new(team_id: Option<String>, credential: Option<String>) -> Self {
        Self { team_id, credential }
    }
}

/// The primitives the external environment provider offers. Everything
/// kiosk knows about sandboxed environments goes through this seam, so
/// tests substitute a scripted implementation.
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    /// Create a fresh environment instance. Returns its opaque reference.
    async fn create_environment(&self, ctx: &ProviderContext) -> Result<String>;

    /// Verify an existing environment is still accepting control calls.
    /// Only valid for live environments; a dead one cannot be resurrected.
    async fn reconnect(&self, environment_ref: &str, ctx: &ProviderContext) -> Result<()>;

    /// Extend the environment's absolute timeout to `duration` from now.
    async fn set_timeout(
        &self,
        environment_ref: &str,
        duration: Duration,
        ctx: &ProviderContext,
    ) -> Result<()>;

    /// Write one file into the environment.
    async fn write_file(
        &self,
        environment_ref: &str,
        path: &str,
        content: &str,
        ctx: &ProviderContext,
    ) -> Result<()>;

    /// Run a command inside the environment (dependency installs).
    async fn run_command(
        &self,
        environment_ref: &str,
        command: &str,
        ctx: &ProviderContext,
    ) -> Result<()>;

    /// Resolve the public URL serving `port` of the environment.
    fn host_url(&self, environment_ref: &str, port: u16) -> String;
}
