//! Schema processors: recognize an encoding/namespace combination and extract
//! operation parameters from it.
//!
//! Every processor offers the same two capabilities:
//!
//! 1. [`SchemaProcessor::parse_general_info`]: operation, service and version,
//!    or [`MalformedRequest`] when the envelope is not for this processor.
//! 2. [`SchemaProcessor::parse_operation_parameters`]: typed [`Parameters`]
//!    for a named operation, or [`ParameterError`].

pub mod kvp;
pub mod structured;

use std::fmt;
use std::sync::Arc;

use csw_core::{Encoding, GeneralRequestInfo, MalformedRequest, Parameters, RequestEnvelope, SchemaSettings};
use serde::Deserialize;

use super::operation::DispatchError;

pub use kvp::KvpSchemaProcessor;
pub use structured::StructuredBodySchemaProcessor;

// ---------------------------------------------------------------------------
// ParameterError
// ---------------------------------------------------------------------------

/// Failure to turn an envelope into typed parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("no parameter parsing rule for operation {name}")]
    UnsupportedOperation { name: String },
    #[error("missing value for parameter {locator}")]
    MissingParameterValue { locator: &'static str },
    #[error("invalid value {value:?} for parameter {locator}")]
    InvalidParameterValue { locator: &'static str, value: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ParameterError> for DispatchError {
    fn from(err: ParameterError) -> Self {
        match err {
            ParameterError::UnsupportedOperation { name } => Self::UnsupportedOperation { name },
            ParameterError::MissingParameterValue { locator } => Self::MissingParameterValue {
                locator: locator.to_string(),
            },
            ParameterError::InvalidParameterValue { locator, value } => {
                Self::InvalidParameterValue {
                    locator: locator.to_string(),
                    value,
                }
            }
            ParameterError::Internal(e) => Self::NoApplicableCode(e),
        }
    }
}

// ---------------------------------------------------------------------------
// SchemaProcessor
// ---------------------------------------------------------------------------

/// Encoding- and schema-specific request reader.
///
/// Processors hold no per-request state and are shared across threads.
pub trait SchemaProcessor: Send + Sync + fmt::Debug {
    /// Encoding this processor reads.
    fn encoding(&self) -> Encoding;

    /// Output schema this processor targets.
    fn settings(&self) -> &SchemaSettings;

    /// Extracts operation, service and version.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRequest`] when the envelope uses another encoding,
    /// targets another namespace, or lacks a required field.
    fn parse_general_info(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<GeneralRequestInfo, MalformedRequest>;

    /// Parses the parameters of `operation_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::UnsupportedOperation`] when no rule exists
    /// for the operation, or a parameter-level error for bad values.
    fn parse_operation_parameters(
        &self,
        envelope: &RequestEnvelope,
        operation_name: &str,
    ) -> Result<Parameters, ParameterError>;
}

/// Configuration of one schema processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessorConfig {
    pub encoding: Encoding,
    #[serde(flatten)]
    pub schema: SchemaSettings,
}

impl ProcessorConfig {
    /// Builds the processor variant matching the configured encoding.
    #[must_use]
    pub fn build(&self) -> Arc<dyn SchemaProcessor> {
        match self.encoding {
            Encoding::Kvp => Arc::new(KvpSchemaProcessor::new(self.schema.clone())),
            Encoding::StructuredBody => {
                Arc::new(StructuredBodySchemaProcessor::new(self.schema.clone()))
            }
        }
    }
}

/// Checks an optional `ElementSetName` against the schema's accepted names.
fn check_element_set(
    settings: &SchemaSettings,
    value: Option<String>,
) -> Result<Option<String>, ParameterError> {
    match value {
        Some(name) if !settings.accepts_element_set(&name) => {
            Err(ParameterError::InvalidParameterValue {
                locator: "ElementSetName",
                value: name,
            })
        }
        other => Ok(other),
    }
}
