//! Immutable deployment snapshots and their atomic publication.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::config::{ConfigError, DeploymentConfig, ServerConfig};
use super::csw::CswService;

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// Every configured service, in candidate order, plus the server settings
/// they were deployed with.
///
/// A snapshot is never mutated after construction. Reconfiguration builds a
/// new snapshot and publishes it through a [`DeploymentHandle`].
#[derive(Debug)]
pub struct Deployment {
    services: Vec<Arc<CswService>>,
    config: Arc<ServerConfig>,
}

impl Deployment {
    /// Validates and wraps the given services.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MultipleDefaults`] if two services of the same
    /// protocol family are both marked default.
    pub fn new(services: Vec<CswService>, config: ServerConfig) -> Result<Self, ConfigError> {
        let mut defaults = HashSet::new();
        for service in services.iter().filter(|s| s.is_default()) {
            if !defaults.insert(service.name()) {
                return Err(ConfigError::MultipleDefaults {
                    service: service.name().to_string(),
                });
            }
        }
        Ok(Self {
            services: services.into_iter().map(Arc::new).collect(),
            config: Arc::new(config),
        })
    }

    /// Builds every service of a deployment description.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised while building a service or
    /// validating the deployment.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self, ConfigError> {
        let services = config
            .services
            .iter()
            .map(CswService::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(services, config.server.clone())
    }

    #[must_use]
    pub fn services(&self) -> &[Arc<CswService>] {
        &self.services
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    /// The default service of the `name` family, if one is marked.
    #[must_use]
    pub fn default_service(&self, name: &str) -> Option<&Arc<CswService>> {
        self.services
            .iter()
            .find(|s| s.is_default() && s.name() == name)
    }

    /// Service mounted at `url_path`, for transports that route by path.
    #[must_use]
    pub fn service_at(&self, url_path: &str) -> Option<&Arc<CswService>> {
        self.services.iter().find(|s| s.url_path() == url_path)
    }
}

// ---------------------------------------------------------------------------
// DeploymentHandle
// ---------------------------------------------------------------------------

/// Shared pointer to the current [`Deployment`].
///
/// Readers take a snapshot with [`load`](Self::load) and keep it for the
/// whole request; a concurrent [`store`](Self::store) never affects them.
#[derive(Debug)]
pub struct DeploymentHandle {
    current: ArcSwap<Deployment>,
}

impl DeploymentHandle {
    #[must_use]
    pub fn new(deployment: Deployment) -> Self {
        Self {
            current: ArcSwap::from_pointee(deployment),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Deployment> {
        self.current.load_full()
    }

    /// Publishes a new snapshot.
    pub fn store(&self, deployment: Deployment) {
        info!(services = deployment.services.len(), "publishing deployment snapshot");
        self.current.store(Arc::new(deployment));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
