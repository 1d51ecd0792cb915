//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::ServerConfig;
use crate::service::executor::OperationExecutor;
use crate::service::operation::{OperationCall, OperationError, OperationResponse};

/// Build the execution pipeline by wrapping the `OperationExecutor` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer`: reject when the server or the resolved service is at
///    capacity, before any work is done
/// 2. `TimeoutLayer`: enforce the call's deadline
/// 3. `MetricsLayer`: record timing and outcome next to the handler
///
/// The returned service implements `tower::Service<OperationCall>`.
#[must_use]
pub fn build_operation_pipeline(
    executor: OperationExecutor,
    config: &ServerConfig,
) -> impl tower::Service<OperationCall, Response = OperationResponse, Error = OperationError> {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(executor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
