//! Request dispatch: resolves raw requests against the current deployment
//! and turns them into executable `OperationCall` values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use csw_core::{HttpVerb, RawRequest, RequestEnvelope};
use tracing::debug;

use super::config::ServerConfig;
use super::deployment::DeploymentHandle;
use super::operation::{DispatchError, OperationCall};
use super::resolver::{resolve_envelope, resolve_for_service, Resolution};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Resolves incoming requests against the published deployment snapshot.
///
/// Each call loads the snapshot once and generates a unique call ID. The
/// call timeout is the operation's own, or else the snapshot's server
/// default.
pub struct Dispatcher {
    deployment: Arc<DeploymentHandle>,
    call_id_counter: AtomicU64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(deployment: Arc<DeploymentHandle>) -> Self {
        Self {
            deployment,
            call_id_counter: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn deployment(&self) -> &Arc<DeploymentHandle> {
        &self.deployment
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Resolves a request against every service of the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] produced by resolution.
    pub fn dispatch(&self, verb: HttpVerb, raw: RawRequest) -> Result<OperationCall, DispatchError> {
        let envelope = RequestEnvelope::try_from(raw).map_err(DispatchError::MalformedRequest)?;
        let snapshot = self.deployment.load();
        let resolution = resolve_envelope(verb, &envelope, snapshot.services())
            .inspect_err(|e| debug!(error = %e, code = %e.code(), "dispatch failed"))?;
        Ok(self.make_call(resolution, snapshot.config()))
    }

    /// Resolves a request against the service mounted at `url_path` only.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoApplicableService`] if nothing is mounted
    /// at `url_path`, otherwise the [`DispatchError`] produced by resolution.
    pub fn dispatch_at(
        &self,
        url_path: &str,
        verb: HttpVerb,
        raw: RawRequest,
    ) -> Result<OperationCall, DispatchError> {
        let envelope = RequestEnvelope::try_from(raw).map_err(DispatchError::MalformedRequest)?;
        let snapshot = self.deployment.load();
        let Some(service) = snapshot.service_at(url_path) else {
            debug!(url_path, "no service mounted at path");
            return Err(DispatchError::NoApplicableService);
        };
        let resolution = resolve_for_service(verb, &envelope, service)
            .inspect_err(|e| debug!(error = %e, code = %e.code(), "dispatch failed"))?;
        Ok(self.make_call(resolution, snapshot.config()))
    }

    fn make_call(&self, resolution: Resolution, config: &Arc<ServerConfig>) -> OperationCall {
        OperationCall {
            call_id: self.next_call_id(),
            call_timeout_ms: resolution
                .operation
                .timeout_ms
                .unwrap_or(config.default_operation_timeout_ms),
            config: Arc::clone(config),
            resolution,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::config::DeploymentConfig;
    use crate::service::deployment::Deployment;

    fn make_dispatcher(json: &str) -> Dispatcher {
        let config = DeploymentConfig::from_json(json).unwrap();
        let deployment = Deployment::from_config(&config).unwrap();
        Dispatcher::new(Arc::new(DeploymentHandle::new(deployment)))
    }

    const GET_CAPS: &str = "request=GetCapabilities&service=CSW&version=2.0.2";

    #[test]
    fn dispatch_assigns_increasing_call_ids() {
        let dispatcher = make_dispatcher(r#"{"services": [{"version": "2.0.2"}]}"#);
        let first = dispatcher
            .dispatch(HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap();
        let second = dispatcher
            .dispatch(HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap();
        assert_eq!(first.call_id, 1);
        assert_eq!(second.call_id, 2);
    }

    #[test]
    fn call_timeout_comes_from_server_config() {
        let dispatcher = make_dispatcher(
            r#"{"server": {"default_operation_timeout_ms": 1500}, "services": [{"version": "2.0.2"}]}"#,
        );
        let call = dispatcher
            .dispatch(HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap();
        assert_eq!(call.call_timeout_ms, 1500);
        assert_eq!(call.config.default_operation_timeout_ms, 1500);
    }

    #[test]
    fn operation_timeout_overrides_server_default() {
        let dispatcher = make_dispatcher(
            r#"{"server": {"default_operation_timeout_ms": 1500}, "services": [{"version": "2.0.2",
                "operations": [
                    {"name": "GetCapabilities"},
                    {"name": "GetRecordById", "timeout_ms": 200}
                ]}]}"#,
        );
        let call = dispatcher
            .dispatch(
                HttpVerb::Get,
                RawRequest::Query("request=GetRecordById&service=CSW&version=2.0.2&Id=a".into()),
            )
            .unwrap();
        assert_eq!(call.call_timeout_ms, 200);

        let call = dispatcher
            .dispatch(HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap();
        assert_eq!(call.call_timeout_ms, 1500);
    }

    #[test]
    fn dispatch_uses_latest_snapshot() {
        let dispatcher = make_dispatcher(r#"{"services": [{"version": "2.0.2"}]}"#);
        let replacement = DeploymentConfig::from_json(r#"{"services": [{"version": "3.0.0"}]}"#).unwrap();
        dispatcher
            .deployment()
            .store(Deployment::from_config(&replacement).unwrap());

        let err = dispatcher
            .dispatch(HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoApplicableService));
    }

    #[test]
    fn dispatch_at_pins_the_service() {
        let dispatcher = make_dispatcher(
            r#"{"services": [
                {"version": "2.0.2", "url_path": "/csw"},
                {"name": "WMS", "version": "1.3.0", "url_path": "/wms"}
            ]}"#,
        );
        let call = dispatcher
            .dispatch_at("/csw", HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap();
        assert_eq!(call.resolution.service.url_path(), "/csw");

        let err = dispatcher
            .dispatch_at("/wms", HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoApplicableSchema { .. }));

        let err = dispatcher
            .dispatch_at("/nowhere", HttpVerb::Get, RawRequest::Query(GET_CAPS.into()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoApplicableService));
    }
}
