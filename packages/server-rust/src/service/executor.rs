//! Operation execution: runs a resolved call through its operation handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use super::operation::{ExecutionContext, OperationCall, OperationError, OperationResponse};
use crate::traits::RepositoryLookup;

// ---------------------------------------------------------------------------
// OperationExecutor
// ---------------------------------------------------------------------------

/// Innermost service of the execution pipeline.
///
/// Builds an [`ExecutionContext`] for each call and hands the resolved
/// parameters to the operation's handler. Always ready; backpressure is the
/// job of the surrounding layers.
#[derive(Clone)]
pub struct OperationExecutor {
    repository: Arc<dyn RepositoryLookup>,
}

impl OperationExecutor {
    #[must_use]
    pub fn new(repository: Arc<dyn RepositoryLookup>) -> Self {
        Self { repository }
    }
}

impl Service<OperationCall> for OperationExecutor {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: OperationCall) -> Self::Future {
        let repository = Arc::clone(&self.repository);
        Box::pin(async move {
            let OperationCall {
                call_id,
                config,
                resolution,
                ..
            } = call;
            let ctx = ExecutionContext {
                call_id,
                service: resolution.service,
                repository,
                config,
            };
            resolution
                .operation
                .handler
                .handle(&ctx, resolution.parameters)
                .await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
