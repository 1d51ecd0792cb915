//! Catalogue service instances: identity, schema processors, and operations.

use std::sync::Arc;

use csw_core::{DistributedSearchPolicy, GeneralRequestInfo, HttpVerb, RequestEnvelope};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use super::config::{ConfigError, ServiceConfig, ServiceMetadata};
use super::domain::builtin_handler;
use super::operation::Operation;
use super::processor::SchemaProcessor;
use super::registry::OperationRegistry;

// ---------------------------------------------------------------------------
// CswService
// ---------------------------------------------------------------------------

/// One configured catalogue service, e.g. `CSW 2.0.2`.
///
/// Built once at configuration time and shared read-only (behind `Arc`)
/// while requests are resolved.
#[derive(Debug)]
pub struct CswService {
    name: String,
    version: String,
    is_default: bool,
    url_path: String,
    metadata: ServiceMetadata,
    processors: Vec<Arc<dyn SchemaProcessor>>,
    operations: OperationRegistry,
    distributed_search: DistributedSearchPolicy,
    call_permits: Option<Arc<Semaphore>>,
}

/// A schema processor that accepted an envelope, with what it read.
#[derive(Debug, Clone)]
pub struct ProcessorMatch<'a> {
    pub processor: &'a Arc<dyn SchemaProcessor>,
    pub info: GeneralRequestInfo,
}

/// Where an enabled operation can be invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub operation: String,
    pub verb: HttpVerb,
    pub url: String,
}

impl CswService {
    /// Creates a service with no processors and no operations.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_default: false,
            url_path: String::new(),
            metadata: ServiceMetadata::default(),
            processors: Vec::new(),
            operations: OperationRegistry::new(),
            distributed_search: DistributedSearchPolicy::default(),
            call_permits: None,
        }
    }

    /// Builds a service from configuration, wiring built-in handlers to the
    /// configured operation names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on duplicate operations or duplicate
    /// (encoding, namespace) processors.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let mut service = Self::new(&config.name, &config.version)
            .with_default(config.is_default)
            .with_url_path(&config.url_path)
            .with_metadata(config.metadata.clone())
            .with_distributed_search(config.distributed_search.clone())
            .with_concurrency_limit(config.max_concurrent_operations);

        for processor in &config.processors {
            service.add_processor(processor.build())?;
        }
        for op in &config.operations {
            let mut operation = Operation::new(
                &op.name,
                op.allowed_verbs.iter().copied(),
                builtin_handler(&op.name),
            );
            operation.enabled = op.enabled;
            operation.timeout_ms = op.timeout_ms;
            service.operations.register(operation)?;
        }
        Ok(service)
    }

    #[must_use]
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    #[must_use]
    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = url_path.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ServiceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_distributed_search(mut self, policy: DistributedSearchPolicy) -> Self {
        self.distributed_search = policy;
        self
    }

    /// Caps the calls this service runs at once. `None` leaves only the
    /// server-wide limit.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: Option<u32>) -> Self {
        self.call_permits = limit.map(|n| Arc::new(Semaphore::new(n as usize)));
        self
    }

    /// Appends a schema processor. Declaration order is match order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateProcessor`] if a processor with the same
    /// encoding and namespace is already present.
    pub fn add_processor(&mut self, processor: Arc<dyn SchemaProcessor>) -> Result<(), ConfigError> {
        let duplicate = self.processors.iter().any(|existing| {
            existing.encoding() == processor.encoding()
                && existing.settings().namespace == processor.settings().namespace
        });
        if duplicate {
            return Err(ConfigError::DuplicateProcessor {
                service: self.name.clone(),
                version: self.version.clone(),
                encoding: processor.encoding(),
                namespace: processor.settings().namespace.clone(),
            });
        }
        self.processors.push(processor);
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    #[must_use]
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    #[must_use]
    pub fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn processors(&self) -> &[Arc<dyn SchemaProcessor>] {
        &self.processors
    }

    #[must_use]
    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    /// Mutable access for configuration-time changes (enable/disable,
    /// registering extra operations).
    pub fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }

    #[must_use]
    pub fn distributed_search(&self) -> &DistributedSearchPolicy {
        &self.distributed_search
    }

    /// Permits backing this service's concurrency limit, if it has one.
    ///
    /// Each snapshot builds its own services, so a reload starts with a fresh
    /// budget while calls already running keep their old permits.
    #[must_use]
    pub fn call_permits(&self) -> Option<&Arc<Semaphore>> {
        self.call_permits.as_ref()
    }

    /// First enabled operation named `name`.
    ///
    /// `None` means "operation not available here", not a hard failure.
    #[must_use]
    pub fn get_enabled_operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get_enabled(name)
    }

    /// Whether a request carrying `info` is addressed to this service.
    ///
    /// Exact service name and version always match. A request without a
    /// version matches only the default service of its family.
    #[must_use]
    pub fn accepts(&self, info: &GeneralRequestInfo) -> bool {
        let service_ok = info.service_name == self.name;
        let version_ok = info.protocol_version.as_deref() == Some(self.version.as_str());
        debug!(
            service = %self.name,
            version = %self.version,
            service_ok,
            version_ok,
            is_default = self.is_default,
            "evaluating service match"
        );
        service_ok && (version_ok || (info.protocol_version.is_none() && self.is_default))
    }

    /// First processor, in declaration order, that can read the envelope and
    /// whose general info this service accepts.
    ///
    /// Processors that reject the envelope are skipped.
    #[must_use]
    pub fn select_schema_processor(&self, envelope: &RequestEnvelope) -> Option<ProcessorMatch<'_>> {
        for processor in &self.processors {
            match processor.parse_general_info(envelope) {
                Ok(info) if self.accepts(&info) => {
                    return Some(ProcessorMatch { processor, info });
                }
                Ok(info) => {
                    debug!(?processor, ?info, "processor read request for another service");
                }
                Err(e) => {
                    debug!(?processor, error = %e, "processor cannot accept request");
                }
            }
        }
        debug!(service = %self.name, version = %self.version, "service cannot accept request");
        None
    }

    /// Invocation URLs for every enabled operation, one per public host and
    /// allowed method.
    #[must_use]
    pub fn endpoints(&self, public_hosts: &[Url], site_name: &str) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();
        for host in public_hosts {
            let base = host.as_str().trim_end_matches('/');
            let url = format!("{base}{site_name}{}", self.url_path);
            for op in self.operations.enabled() {
                for verb in [HttpVerb::Get, HttpVerb::Post] {
                    if op.allows(verb) {
                        endpoints.push(Endpoint {
                            operation: op.name.clone(),
                            verb,
                            url: url.clone(),
                        });
                    }
                }
            }
        }
        endpoints
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
