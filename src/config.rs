//! Configuration loading and types for quillstore.
//!
//! Configuration is read from a YAML file and deserialized into
//! [`Config`]. Every field carries a default so a minimal (or empty)
//! file yields a working local-development setup against an S3
//! emulator.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Object storage endpoints and credentials.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Deployment-wide switches.
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Object storage endpoint configuration.
///
/// Signed URLs are only valid for the exact hostname they were signed
/// under. Deployments where the sync server reaches the store through
/// a different hostname than end-user clients therefore configure two
/// pairs: the fields below describe the public one, `internal` the
/// network-local one. Region and credentials are shared by both.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Public S3-compatible service URL, scheme included.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Static access key id.
    #[serde(default = "default_access_key_id")]
    pub access_key_id: String,

    /// Static secret access key.
    #[serde(default = "default_secret_access_key")]
    pub secret_access_key: String,

    /// Bucket holding user attachments.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Optional network-local endpoint, preferred for internal traffic.
    #[serde(default)]
    pub internal: Option<InternalStorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            service_url: default_service_url(),
            region: default_region(),
            access_key_id: default_access_key_id(),
            secret_access_key: default_secret_access_key(),
            bucket: default_bucket(),
            internal: None,
        }
    }
}

/// Network-local client/bucket pair.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalStorageConfig {
    /// Internal S3-compatible service URL, scheme included.
    pub service_url: String,

    /// Bucket name as addressed through the internal endpoint.
    pub bucket: String,
}

/// Deployment-wide switches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentConfig {
    /// Self-hosted deployments are exempt from the attachment size
    /// ceiling.
    #[serde(default)]
    pub self_hosted: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Dev defaults match a local s3rver emulator.
fn default_service_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_access_key_id() -> String {
    "S3RVER".to_string()
}

fn default_secret_access_key() -> String {
    "S3RVER".to_string()
}

fn default_bucket() -> String {
    "attachments".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
