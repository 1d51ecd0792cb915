//! Call deadlines.
//!
//! Each call brings its own budget in `call_timeout_ms`: the operation's
//! configured timeout, or the server default when it has none. An expired
//! call becomes [`OperationError::Timeout`], whose exception report points at
//! the operation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use tracing::warn;

use crate::service::operation::{OperationCall, OperationError, OperationResponse};

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S> Service<OperationCall> for TimeoutService<S>
where
    S: Service<OperationCall, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: OperationCall) -> Self::Future {
        let call_id = call.call_id;
        let timeout_ms = call.call_timeout_ms;
        let operation = call.resolution.operation.name.clone();
        let fut = self.inner.call(call);
        Box::pin(async move {
            tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
                .await
                .unwrap_or_else(|_elapsed| {
                    warn!(call_id, operation = %operation, timeout_ms, "call exceeded its deadline");
                    Err(OperationError::Timeout {
                        operation,
                        timeout_ms,
                    })
                })
        })
    }
}
