use std::collections::BTreeSet;
use std::path::Path;

use csw_core::{
    operation_names, DistributedSearchPolicy, Encoding, HttpVerb, SchemaSettings,
};
use serde::{Deserialize, Serialize};
use url::Url;

use super::processor::ProcessorConfig;

/// Server-level configuration for the operation pipeline.
///
/// Controls operation timeouts, concurrency limits, and the public addresses
/// advertised in capabilities documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Base URLs under which this deployment is reachable.
    pub public_hosts: Vec<Url>,
    /// Path prefix shared by every service endpoint, e.g. `/catalogue`.
    pub site_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            public_hosts: Vec::new(),
            site_name: String::new(),
        }
    }
}

/// Descriptive metadata a service advertises in its capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMetadata {
    pub title: String,
    pub r#abstract: String,
    pub keywords: Vec<String>,
    pub fees: String,
    pub access_constraints: String,
}

/// One operation entry in a service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationConfig {
    pub name: String,
    #[serde(default = "default_verbs")]
    pub allowed_verbs: BTreeSet<HttpVerb>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Call timeout for this operation; the server default applies when
    /// absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Configuration of one catalogue service instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub url_path: String,
    #[serde(default)]
    pub metadata: ServiceMetadata,
    #[serde(default)]
    pub distributed_search: DistributedSearchPolicy,
    /// Concurrent calls this service may run, on top of the server-wide
    /// limit. Unlimited when absent.
    #[serde(default)]
    pub max_concurrent_operations: Option<u32>,
    #[serde(default = "default_processors")]
    pub processors: Vec<ProcessorConfig>,
    #[serde(default = "default_operations")]
    pub operations: Vec<OperationConfig>,
}

/// A whole deployment: server settings plus every configured service, in
/// candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub services: Vec<ServiceConfig>,
}

impl DeploymentConfig {
    /// Parses a JSON deployment description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid JSON or unknown shapes.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON deployment file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid deployment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Errors from building services and deployments.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("operation {name} is registered twice")]
    DuplicateOperation { name: String },
    #[error("service {service} {version} declares two {encoding} processors for {namespace}")]
    DuplicateProcessor {
        service: String,
        version: String,
        encoding: Encoding,
        namespace: String,
    },
    #[error("more than one default service named {service}")]
    MultipleDefaults { service: String },
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_service_name() -> String {
    "CSW".to_string()
}

fn default_verbs() -> BTreeSet<HttpVerb> {
    [HttpVerb::Get, HttpVerb::Post].into_iter().collect()
}

fn enabled() -> bool {
    true
}

fn default_processors() -> Vec<ProcessorConfig> {
    vec![
        ProcessorConfig {
            encoding: Encoding::Kvp,
            schema: SchemaSettings::csw_record(),
        },
        ProcessorConfig {
            encoding: Encoding::StructuredBody,
            schema: SchemaSettings::csw_record(),
        },
    ]
}

fn default_operations() -> Vec<OperationConfig> {
    [operation_names::GET_CAPABILITIES, operation_names::GET_RECORD_BY_ID]
        .into_iter()
        .map(|name| OperationConfig {
            name: name.to_string(),
            allowed_verbs: default_verbs(),
            enabled: true,
            timeout_ms: None,
        })
        .collect()
}
