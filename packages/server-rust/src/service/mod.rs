//! Request dispatch and operation execution.
//!
//! This module implements the catalogue request pipeline:
//!
//! 1. **Processors** (`processor`): read general info and typed parameters from an envelope
//! 2. **Services** (`csw`, `registry`): configured services and their operations
//! 3. **Resolution** (`resolver`): pick service, processor, operation, and parameters
//! 4. **Dispatch** (`dispatcher`, `deployment`): resolve against the published snapshot
//! 5. **Execution** (`executor`, `middleware`, `domain`): Tower stack around the handlers

pub mod config;
pub mod csw;
pub mod deployment;
pub mod dispatcher;
pub mod domain;
pub mod executor;
pub mod middleware;
pub mod operation;
pub mod processor;
pub mod registry;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types for convenient access.
pub use config::{ConfigError, DeploymentConfig, ServerConfig, ServiceConfig};
pub use csw::{CswService, Endpoint};
pub use deployment::{Deployment, DeploymentHandle};
pub use dispatcher::Dispatcher;
pub use executor::OperationExecutor;
pub use middleware::build_operation_pipeline;
pub use operation::{
    DispatchError, ExecutionContext, NotSupportedReason, Operation, OperationCall,
    OperationError, OperationHandler, OperationResponse,
};
pub use processor::{
    KvpSchemaProcessor, ParameterError, ProcessorConfig, SchemaProcessor,
    StructuredBodySchemaProcessor,
};
pub use registry::OperationRegistry;
pub use resolver::{resolve, resolve_envelope, resolve_for_service, Resolution};
