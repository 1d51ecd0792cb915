//! Request resolution: turns a raw request into a service, an operation, and
//! typed parameters.
//!
//! The rules are applied in a fixed order, and the first acceptable candidate
//! wins at every stage:
//!
//! 1. **Service**: the first candidate service with a schema processor that
//!    reads the request and accepts its service name and version (a
//!    version-less request is taken by the default service of its family).
//! 2. **Schema processor**: within that service, the first processor that
//!    accepts the request.
//! 3. **Operation**: the first enabled operation with the requested name.
//! 4. **Method**: the operation must answer the request's HTTP method.
//! 5. **Parameters**: the processor parses the operation's parameters.
//!
//! Candidate rejections at stages 1 and 2 drive the search forward; any
//! failure after that is terminal. Nothing here mutates shared state, so
//! resolving the same input against the same services always yields the same
//! result.

use std::sync::Arc;

use csw_core::{HttpVerb, Parameters, RawRequest, RequestEnvelope};
use serde::Serialize;
use tracing::debug;

use super::csw::{CswService, ProcessorMatch};
use super::operation::{DispatchError, NotSupportedReason, Operation};
use super::processor::SchemaProcessor;

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub service: Arc<CswService>,
    /// Schema processor that read the request.
    pub processor: Arc<dyn SchemaProcessor>,
    pub operation: Operation,
    pub parameters: Parameters,
}

/// Serializable description of a [`Resolution`].
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSummary<'a> {
    pub service: &'a str,
    pub version: &'a str,
    pub schema: &'a str,
    pub operation: &'a str,
    pub parameters: &'a Parameters,
}

impl Resolution {
    #[must_use]
    pub fn summary(&self) -> ResolutionSummary<'_> {
        ResolutionSummary {
            service: self.service.name(),
            version: self.service.version(),
            schema: &self.processor.settings().namespace,
            operation: &self.operation.name,
            parameters: &self.parameters,
        }
    }
}

/// Resolves a raw request against the candidate services.
///
/// # Errors
///
/// Returns [`DispatchError::MalformedRequest`] when the body cannot be parsed,
/// and otherwise whatever [`resolve_envelope`] returns.
pub fn resolve(
    verb: HttpVerb,
    raw: RawRequest,
    services: &[Arc<CswService>],
) -> Result<Resolution, DispatchError> {
    let envelope = RequestEnvelope::try_from(raw).map_err(DispatchError::MalformedRequest)?;
    resolve_envelope(verb, &envelope, services)
}

/// Resolves an envelope against the candidate services, in order.
///
/// # Errors
///
/// Returns [`DispatchError::NoApplicableService`] when no service accepts the
/// request; errors from the selected service are returned as is, never
/// retried against a later candidate.
pub fn resolve_envelope(
    verb: HttpVerb,
    envelope: &RequestEnvelope,
    services: &[Arc<CswService>],
) -> Result<Resolution, DispatchError> {
    let Some((service, matched)) = services.iter().find_map(|service| {
        service
            .select_schema_processor(envelope)
            .map(|matched| (service, matched))
    }) else {
        debug!(candidates = services.len(), "no service accepts request");
        return Err(DispatchError::NoApplicableService);
    };
    resolve_operation(verb, envelope, service, &matched)
}

/// Resolves an envelope against one already-chosen service.
///
/// Used directly when the transport pins the service (e.g. by URL path).
///
/// # Errors
///
/// - [`DispatchError::NoApplicableSchema`] if no processor of the service
///   accepts the request
/// - [`DispatchError::OperationNotSupported`] if the operation is absent,
///   disabled, or not bound to `verb`
/// - parameter errors from the processor, with unexpected faults wrapped as
///   [`DispatchError::NoApplicableCode`]
pub fn resolve_for_service(
    verb: HttpVerb,
    envelope: &RequestEnvelope,
    service: &Arc<CswService>,
) -> Result<Resolution, DispatchError> {
    let Some(matched) = service.select_schema_processor(envelope) else {
        return Err(DispatchError::NoApplicableSchema {
            service: service.name().to_string(),
        });
    };
    resolve_operation(verb, envelope, service, &matched)
}

/// Operation lookup, method check and parameter parsing for a service whose
/// processor already accepted the request.
fn resolve_operation(
    verb: HttpVerb,
    envelope: &RequestEnvelope,
    service: &Arc<CswService>,
    matched: &ProcessorMatch<'_>,
) -> Result<Resolution, DispatchError> {
    let name = matched.info.operation_name.as_str();

    let Some(operation) = service.get_enabled_operation(name) else {
        debug!(operation = name, service = service.name(), "operation unavailable");
        return Err(DispatchError::OperationNotSupported {
            name: name.to_string(),
            reason: NotSupportedReason::Unavailable,
        });
    };

    if !operation.allows(verb) {
        debug!(operation = name, %verb, "operation not bound to method");
        return Err(DispatchError::OperationNotSupported {
            name: name.to_string(),
            reason: NotSupportedReason::VerbNotAllowed(verb),
        });
    }

    let parameters = matched
        .processor
        .parse_operation_parameters(envelope, name)
        .inspect_err(|e| debug!(operation = name, error = %e, "parameter parsing failed"))?;

    Ok(Resolution {
        service: Arc::clone(service),
        processor: Arc::clone(matched.processor),
        operation: operation.clone(),
        parameters,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
