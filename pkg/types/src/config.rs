use serde::{Deserialize, Serialize};

/// Server configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// port: 7070
/// data-dir: /var/lib/kiosk/data
/// token: my-secret-token
/// base-url: https://kiosk.example.com
/// provider-endpoint: https://api.sandbox.example
/// provider-domain: sandbox.example
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfigFile {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Public site base, used to mint `{base}/app/{lease-id}` links.
    #[serde(default, alias = "base-url")]
    pub base_url: Option<String>,
    /// Environment provider control API.
    #[serde(default, alias = "provider-endpoint")]
    pub provider_endpoint: Option<String>,
    /// Domain environments are exposed under, e.g. `sandbox.example`
    /// for `https://{port}-{ref}.sandbox.example`.
    #[serde(default, alias = "provider-domain")]
    pub provider_domain: Option<String>,
    #[serde(default, alias = "provider-api-key")]
    pub provider_api_key: Option<String>,
    /// Durable ownership record service. Optional; lease publishing
    /// works without it.
    #[serde(default, alias = "records-endpoint")]
    pub records_endpoint: Option<String>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
