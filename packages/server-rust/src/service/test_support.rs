//! Shared fixtures for unit tests in the `service` module.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use csw_core::{HttpVerb, RawRequest};
use tower::Service;

use super::config::DeploymentConfig;
use super::deployment::Deployment;
use super::operation::{
    ExecutionContext, OperationCall, OperationError, OperationResponse,
};
use super::resolver::resolve;
use crate::storage::InMemoryRepository;
use crate::traits::RepositoryLookup;

/// Execution context for the first service of a JSON deployment, backed by
/// an empty repository whose schema has not been created.
pub(crate) fn context(json: &str) -> ExecutionContext {
    context_with_repository(json, Arc::new(InMemoryRepository::new()))
}

pub(crate) fn context_with_repository(
    json: &str,
    repository: Arc<dyn RepositoryLookup>,
) -> ExecutionContext {
    let deployment = deployment(json);
    ExecutionContext {
        call_id: 1,
        service: Arc::clone(&deployment.services()[0]),
        repository,
        config: Arc::clone(deployment.config()),
    }
}

pub(crate) fn deployment(json: &str) -> Deployment {
    Deployment::from_config(&DeploymentConfig::from_json(json).unwrap()).unwrap()
}

/// Resolves a GET query against `deployment` and wraps it as a call.
/// Calls built from the same deployment share its services.
pub(crate) fn call_against(
    deployment: &Deployment,
    query: &str,
    call_id: u64,
    call_timeout_ms: u64,
) -> OperationCall {
    let resolution = resolve(
        HttpVerb::Get,
        RawRequest::Query(query.into()),
        deployment.services(),
    )
    .unwrap();
    OperationCall {
        call_id,
        call_timeout_ms,
        config: Arc::clone(deployment.config()),
        resolution,
    }
}

/// A resolved `GetCapabilities` call against a default CSW 2.0.2 service.
pub(crate) fn capabilities_call(call_id: u64, call_timeout_ms: u64) -> OperationCall {
    call_against(
        &deployment(r#"{"services": [{"version": "2.0.2"}]}"#),
        "request=GetCapabilities&service=CSW&version=2.0.2",
        call_id,
        call_timeout_ms,
    )
}

/// Inner service that answers with an empty record list after a delay.
pub(crate) struct DelayedService {
    pub delay_ms: u64,
}

impl Service<OperationCall> for DelayedService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _call: OperationCall) -> Self::Future {
        let delay = Duration::from_millis(self.delay_ms);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(OperationResponse::Records {
                records: Vec::new(),
                fan_out: None,
            })
        })
    }
}
