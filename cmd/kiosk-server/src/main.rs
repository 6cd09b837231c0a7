use clap::Parser;
use pkg_api::server::{ServerConfig, start_server};
use pkg_types::config::{ServerConfigFile, load_config_file};
use std::net::SocketAddr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "kiosk-server", about = "kiosk lease registry server")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = "/etc/kiosk/config.yaml")]
    config: String,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Bearer token protecting the mutating API routes
    #[arg(long)]
    token: Option<String>,

    /// Public site base for minted lease URLs
    #[arg(long)]
    base_url: Option<String>,

    /// Environment provider control API endpoint
    #[arg(long)]
    provider_endpoint: Option<String>,

    /// Domain environments are exposed under
    #[arg(long)]
    provider_domain: Option<String>,

    /// API key for the environment provider
    #[arg(long)]
    provider_api_key: Option<String>,

    /// Durable ownership record service endpoint (optional)
    #[arg(long)]
    records_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: ServerConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let port = cli.port.or(file_cfg.port).unwrap_or(7070);
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| "/tmp/kiosk-data".to_string());
    let token = cli
        .token
        .or(file_cfg.token)
        .unwrap_or_else(|| "demo-token-123".to_string());
    let base_url = cli
        .base_url
        .or(file_cfg.base_url)
        .unwrap_or_else(|| format!("http://localhost:{}", port));
    let provider_endpoint = cli
        .provider_endpoint
        .or(file_cfg.provider_endpoint)
        .unwrap_or_else(|| "http://127.0.0.1:7080".to_string());
    let provider_domain = cli
        .provider_domain
        .or(file_cfg.provider_domain)
        .unwrap_or_else(|| "sandbox.localhost".to_string());
    let provider_api_key = cli.provider_api_key.or(file_cfg.provider_api_key);
    let records_endpoint = cli.records_endpoint.or(file_cfg.records_endpoint);

    info!("Starting kiosk-server");
    info!("  Port:      {}", port);
    info!("  Data dir:  {}", data_dir);
    info!("  Base URL:  {}", base_url);
    info!("  Provider:  {}", provider_endpoint);
    info!("  Token:     {}***", &token[..token.len().min(4)]);

    let config = ServerConfig {
        addr: SocketAddr::from(([0, 0, 0, 0], port)),
        data_dir,
        api_token: token,
        base_url,
        provider_endpoint,
        provider_domain,
        provider_api_key,
        records_endpoint,
    };

    start_server(config).await?;

    Ok(())
}
