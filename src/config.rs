use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; when absent the in-memory store is used
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub auto_release: AutoReleaseConfig,
    /// Mailer endpoint for delivery/release/dispute emails; log-only if unset
    #[serde(default)]
    pub mailer_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Payment provider Merchant API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_version: String,
    /// Bounded timeout for provider HTTP calls
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://sandbox-merchant.example.com/api/1.0".to_string(),
            secret_key: "sk_test_demo_key_for_development".to_string(),
            webhook_secret: "whsec_test_demo_webhook_secret".to_string(),
            api_version: "2023-09-01".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    /// Demo keys switch the service to the simulated provider
    pub fn is_demo(&self) -> bool {
        self.secret_key.contains("demo")
    }
}

/// Auto-release SLA configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AutoReleaseConfig {
    pub window_days: i64,
    pub scan_interval_secs: u64,
    pub batch_size: i64,
}

impl Default for AutoReleaseConfig {
    fn default() -> Self {
        Self {
            window_days: 5,
            scan_interval_secs: 300,
            batch_size: 100,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
