pub mod auth;
pub mod handlers;
pub mod server;

use std::sync::Arc;

use pkg_lease::publisher::Publisher;
use pkg_lease::rebuild::RebuildReconciler;
use pkg_probe::Prober;
use pkg_provider::EnvironmentProvider;
use pkg_state::lease_store::LeaseStore;

/// Shared application state injected into all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub leases: LeaseStore,
    pub provider: Arc<dyn EnvironmentProvider>,
    pub prober: Arc<Prober>,
    pub publisher: Arc<Publisher>,
    pub reconciler: Arc<RebuildReconciler>,
    pub api_token: String,
}
