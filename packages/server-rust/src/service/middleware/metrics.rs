//! Call instrumentation on `tracing` spans.
//!
//! Every call runs inside an `operation` span that names the service, its
//! version, the schema the request was read with and the operation. When the
//! call finishes the span records how long it took and a [`CallOutcome`]:
//! `ok` plus the number of records returned, or the exception code and
//! locator the client will see. Server-side faults log at warn, client
//! errors at info.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use csw_core::ExceptionCode;
use tower::{Layer, Service};
use tracing::{field, info, info_span, warn, Instrument, Span};

use crate::service::operation::{OperationCall, OperationError, OperationResponse};

/// What a finished call looked like from the client's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// `ok`, or the exception code reported to the client.
    pub outcome: &'static str,
    /// Records returned by a record-producing operation.
    pub records: Option<usize>,
    pub locator: Option<String>,
    /// The failure is the server's, not the request's.
    pub server_fault: bool,
}

impl CallOutcome {
    #[must_use]
    pub fn of(result: &Result<OperationResponse, OperationError>) -> Self {
        match result {
            Ok(response) => Self {
                outcome: "ok",
                records: match response {
                    OperationResponse::Records { records, .. } => Some(records.len()),
                    OperationResponse::Capabilities(_) => None,
                },
                locator: None,
                server_fault: false,
            },
            Err(e) => {
                let report = e.report();
                Self {
                    outcome: report.code.as_str(),
                    records: None,
                    locator: report.locator,
                    server_fault: report.code == ExceptionCode::NoApplicableCode,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<OperationCall> for MetricsService<S>
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
        let resolution = &call.resolution;
        let span = info_span!(
            "operation",
            call_id = call.call_id,
            service = resolution.service.name(),
            version = resolution.service.version(),
            schema = %resolution.processor.settings().namespace,
            operation = %resolution.operation.name,
            duration_ms = field::Empty,
            outcome = field::Empty,
            records = field::Empty,
            locator = field::Empty,
        );

        let fut = self.inner.call(call);
        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                let outcome = CallOutcome::of(&result);
                let span = Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome.outcome);
                span.record("records", outcome.records);
                span.record("locator", outcome.locator.as_deref());

                if outcome.server_fault {
                    warn!(duration_ms, outcome = outcome.outcome, "operation failed");
                } else {
                    info!(duration_ms, outcome = outcome.outcome, "operation complete");
                }
                result
            }
            .instrument(span),
        )
    }
}
