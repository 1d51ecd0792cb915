//! Built-in operation handlers.
//!
//! Each configured operation name is wired to a handler by [`builtin_handler`].
//! Names without an implementation get [`NotImplementedHandler`], so they can
//! still be registered, listed in capabilities, enabled and disabled.

pub mod capabilities;
pub mod records;

use std::sync::Arc;

use async_trait::async_trait;
use csw_core::{operation_names, Parameters};

use crate::service::operation::{
    ExecutionContext, OperationError, OperationHandler, OperationResponse,
};

pub use capabilities::{
    CapabilitiesDocument, GetCapabilitiesHandler, OperationMetadata, OperationsMetadata,
    ServiceIdentification,
};
pub use records::GetRecordByIdHandler;

/// Handler for operations this server registers but does not execute.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplementedHandler;

#[async_trait]
impl OperationHandler for NotImplementedHandler {
    async fn handle(
        &self,
        _ctx: &ExecutionContext,
        parameters: Parameters,
    ) -> Result<OperationResponse, OperationError> {
        Err(OperationError::NotImplemented {
            operation: parameters.operation_name().to_string(),
        })
    }
}

/// Handler for the operation named `name`.
#[must_use]
pub fn builtin_handler(name: &str) -> Arc<dyn OperationHandler> {
    match name {
        operation_names::GET_CAPABILITIES => Arc::new(GetCapabilitiesHandler),
        operation_names::GET_RECORD_BY_ID => Arc::new(GetRecordByIdHandler),
        _ => Arc::new(NotImplementedHandler),
    }
}

#[cfg(test)]
mod tests {
    use csw_core::GetCapabilitiesParameters;

    use super::*;
    use crate::service::test_support::context;

    #[tokio::test]
    async fn not_implemented_handler_reports_operation() {
        let ctx = context(r#"{"services": [{"version": "2.0.2"}]}"#);
        let err = NotImplementedHandler
            .handle(
                &ctx,
                Parameters::GetCapabilities(GetCapabilitiesParameters::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::NotImplemented { ref operation } if operation == "GetCapabilities"));
    }

    #[tokio::test]
    async fn unknown_names_get_not_implemented_handler() {
        let ctx = context(r#"{"services": [{"version": "2.0.2"}]}"#);
        let handler = builtin_handler("Harvest");
        let err = handler
            .handle(
                &ctx,
                Parameters::GetCapabilities(GetCapabilitiesParameters::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::NotImplemented { .. }));
    }

    #[tokio::test]
    async fn builtin_names_get_real_handlers() {
        let ctx = context(r#"{"services": [{"version": "2.0.2"}]}"#);
        let response = builtin_handler("GetCapabilities")
            .handle(
                &ctx,
                Parameters::GetCapabilities(GetCapabilitiesParameters::default()),
            )
            .await
            .unwrap();
        assert!(matches!(response, OperationResponse::Capabilities(_)));
    }
}
