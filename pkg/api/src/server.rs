use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::AppState;
use crate::auth::auth_middleware;
use crate::handlers::{apps, environments, leases, probe, rebuild};
use pkg_lease::publisher::Publisher;
use pkg_lease::rebuild::RebuildReconciler;
use pkg_lease::sync::RecordSync;
use pkg_probe::Prober;
use pkg_provider::HttpProvider;
use pkg_state::client::StateStore;
use pkg_state::expiry::ExpiryController;
use pkg_state::lease_store::LeaseStore;
use pkg_state::lock::RebuildLock;

/// Server configuration passed from the binary's CLI.
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub data_dir: String,
    pub api_token: String,
    /// Public site base for minted lease URLs.
    pub base_url: String,
    pub provider_endpoint: String,
    pub provider_domain: String,
    pub provider_api_key: Option<String>,
    pub records_endpoint: Option<String>,
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize core subsystems. Everything is explicitly constructed
    // here and handed down; no module-level store clients.
    let store = StateStore::new(&config.data_dir).await?;
    let leases = LeaseStore::new(store.clone());
    let lock = RebuildLock::new(store.clone());
    let provider: Arc<dyn pkg_provider::EnvironmentProvider> = Arc::new(HttpProvider::new(
        &config.provider_endpoint,
        &config.provider_domain,
        config.provider_api_key.clone(),
    )?);
    let prober = Arc::new(Prober::new()?);
    let record_sync = RecordSync::new(config.records_endpoint.clone())?;
    let publisher = Arc::new(Publisher::new(
        leases.clone(),
        provider.clone(),
        record_sync,
        &config.base_url,
    ));
    let reconciler = Arc::new(RebuildReconciler::new(
        leases.clone(),
        lock,
        provider.clone(),
    ));

    let state = AppState {
        leases,
        provider,
        prober,
        publisher,
        reconciler,
        api_token: config.api_token,
    };

    // Start the expiry sweeper background task
    let expiry = ExpiryController::new(store.clone());
    expiry.start();

    // Protected API routes
    let api_routes = Router::new()
        .route(
            "/api/v1/leases",
            post(leases::publish_lease),
        )
        .route(
            "/api/v1/leases/{id}",
            get(leases::read_lease).put(leases::update_lease),
        )
        .route(
            "/api/v1/leases/{id}/rebuild",
            post(rebuild::rebuild_lease),
        )
        .route(
            "/api/v1/environments/{ref}/sync",
            post(environments::sync_environment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Public routes + merged
    let app = Router::new()
        .route("/api/v1/probe", post(probe::probe_liveness))
        .route("/app/{id}", get(apps::resolve_app))
        .merge(api_routes)
        .with_state(state);

    info!("Starting API server on {}", config.addr);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
