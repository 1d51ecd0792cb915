//! Load shedding for operation calls.
//!
//! Two budgets apply to every call: the server-wide
//! `max_concurrent_operations`, and the limit of the resolved service when it
//! configures one. A call that finds either budget spent fails at once with
//! [`OperationError::Overloaded`] or [`OperationError::ServiceBusy`]; nothing
//! is queued. Both report `NoApplicableCode` to the client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower::{Layer, Service};
use tracing::warn;

use crate::service::operation::{OperationCall, OperationError, OperationResponse};

#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    server_permits: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            server_permits: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            server_permits: Arc::clone(&self.server_permits),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    server_permits: Arc<Semaphore>,
}

/// Budget slots held for the lifetime of one call.
struct CallPermits {
    _server: OwnedSemaphorePermit,
    _service: Option<OwnedSemaphorePermit>,
}

impl<S> LoadShedService<S> {
    fn reserve(&self, call: &OperationCall) -> Result<CallPermits, OperationError> {
        let service = &call.resolution.service;
        let Ok(server) = Arc::clone(&self.server_permits).try_acquire_owned() else {
            warn!(
                call_id = call.call_id,
                operation = %call.resolution.operation.name,
                "shedding call, server at capacity"
            );
            return Err(OperationError::Overloaded);
        };

        let service_permit = match service.call_permits() {
            None => None,
            Some(permits) => {
                let Ok(permit) = Arc::clone(permits).try_acquire_owned() else {
                    warn!(
                        call_id = call.call_id,
                        service = service.name(),
                        version = service.version(),
                        "shedding call, service at capacity"
                    );
                    return Err(OperationError::ServiceBusy {
                        service: service.name().to_string(),
                        version: service.version().to_string(),
                    });
                };
                Some(permit)
            }
        };

        Ok(CallPermits {
            _server: server,
            _service: service_permit,
        })
    }
}

impl<S> Service<OperationCall> for LoadShedService<S>
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
        let permits = match self.reserve(&call) {
            Ok(permits) => permits,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let fut = self.inner.call(call);
        Box::pin(async move {
            let result = fut.await;
            drop(permits);
            result
        })
    }
}
