//! `GetRecordById`: looks records up through the repository.

use async_trait::async_trait;
use csw_core::Parameters;
use tracing::debug;

use crate::service::operation::{
    ExecutionContext, OperationError, OperationHandler, OperationResponse,
};

/// Answers `GetRecordById` requests. Unknown identifiers are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRecordByIdHandler;

#[async_trait]
impl OperationHandler for GetRecordByIdHandler {
    async fn handle(
        &self,
        ctx: &ExecutionContext,
        parameters: Parameters,
    ) -> Result<OperationResponse, OperationError> {
        let actual = parameters.operation_name();
        let Parameters::GetRecordById(params) = parameters else {
            return Err(OperationError::WrongParameters {
                expected: "GetRecordById",
                actual,
            });
        };

        let mut records = Vec::with_capacity(params.id.len());
        for id in &params.id {
            match ctx.repository.fetch_by_id(id).await? {
                Some(record) => records.push(record),
                None => debug!(call_id = ctx.call_id, id = %id, "record not found"),
            }
        }

        Ok(OperationResponse::Records {
            records,
            fan_out: ctx.service.distributed_search().plan(),
        })
    }
}
