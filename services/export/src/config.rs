use serde::Deserialize;

/// Main configuration for the export job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Secret store configuration
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Analytics API configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP trigger configuration
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (json or pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Metrics port, only bound when the HTTP trigger is enabled
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Names of the secrets the job reads, and where to read them from
#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    /// Project that namespaces every secret id
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// Secret holding the object storage service-account key (JSON)
    #[serde(default = "default_storage_credentials_secret")]
    pub storage_credentials_secret: String,
    /// Secret holding the analytics API access token
    #[serde(default = "default_access_token_secret")]
    pub access_token_secret: String,
    /// Secret holding the analytics customer id
    #[serde(default = "default_tenant_id_secret")]
    pub tenant_id_secret: String,
    /// Region of the secret store (falls back to the ambient AWS region)
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack, etc.)
    pub endpoint_url: Option<String>,
}

/// Analytics API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Base URL of the analytics API, without the `/v1` path
    #[serde(default = "default_analytics_base_url")]
    pub base_url: String,
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket receiving both artifacts
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Storage region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for GCS interoperability, MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Key prefix of the raw JSON artifact
    #[serde(default = "default_raw_key_prefix")]
    pub raw_key_prefix: String,
    /// Key prefix of the CSV artifact
    #[serde(default = "default_tabular_key_prefix")]
    pub tabular_key_prefix: String,
}

/// HTTP trigger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Serve the job over HTTP instead of running it once
    #[serde(default)]
    pub enabled: bool,
    /// Listen address
    #[serde(default = "default_trigger_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_trigger_port")]
    pub port: u16,
}

// Default value functions
fn default_service_name() -> String {
    "sprout-export".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_project_id() -> String {
    "exportsproutinformation".to_string()
}

fn default_storage_credentials_secret() -> String {
    "google-cloud-credentials".to_string()
}

fn default_access_token_secret() -> String {
    "sprout-access-token".to_string()
}

fn default_tenant_id_secret() -> String {
    "sprout-customer-id".to_string()
}

fn default_analytics_base_url() -> String {
    "https://api.sproutsocial.com".to_string()
}

fn default_bucket() -> String {
    "sprout_responses_json".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_raw_key_prefix() -> String {
    "sproutsocial_post_response_".to_string()
}

fn default_tabular_key_prefix() -> String {
    "customer_data_".to_string()
}

fn default_trigger_host() -> String {
    "0.0.0.0".to_string()
}

fn default_trigger_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/export").required(false))
            .add_source(config::File::with_name("/etc/sprout-export/export").required(false))
            // Override with environment variables
            // EXPORT__STORAGE__BUCKET -> storage.bucket
            .add_source(
                config::Environment::with_prefix("EXPORT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Address the HTTP trigger binds to
    pub fn trigger_addr(&self) -> String {
        format!("{}:{}", self.trigger.host, self.trigger.port)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            storage_credentials_secret: default_storage_credentials_secret(),
            access_token_secret: default_access_token_secret(),
            tenant_id_secret: default_tenant_id_secret(),
            region: None,
            endpoint_url: None,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: default_analytics_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            raw_key_prefix: default_raw_key_prefix(),
            tabular_key_prefix: default_tabular_key_prefix(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_trigger_host(),
            port: default_trigger_port(),
        }
    }
}
