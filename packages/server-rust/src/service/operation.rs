use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use csw_core::{
    ExceptionCode, ExceptionReport, FanOutPlan, HttpVerb, MalformedRequest, Parameters, Record,
};
use serde::Serialize;

use super::config::ServerConfig;
use super::csw::CswService;
use super::domain::CapabilitiesDocument;
use super::resolver::Resolution;
use crate::traits::RepositoryLookup;

/// Version of the OWS exception report schema used by CSW 2.0.2.
pub const OWS_EXCEPTION_VERSION: &str = "1.2.0";

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Executes one catalogue operation with already-parsed parameters.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &ExecutionContext,
        parameters: Parameters,
    ) -> Result<OperationResponse, OperationError>;
}

/// A named operation a service exposes, with the HTTP methods it answers.
///
/// Cloning is cheap: the handler is shared.
#[derive(Clone)]
pub struct Operation {
    pub name: String,
    pub allowed_verbs: BTreeSet<HttpVerb>,
    pub enabled: bool,
    /// Overrides the server's default call timeout for this operation.
    pub timeout_ms: Option<u64>,
    pub handler: Arc<dyn OperationHandler>,
}

impl Operation {
    /// Creates an enabled operation.
    pub fn new(
        name: impl Into<String>,
        allowed_verbs: impl IntoIterator<Item = HttpVerb>,
        handler: Arc<dyn OperationHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            allowed_verbs: allowed_verbs.into_iter().collect(),
            enabled: true,
            timeout_ms: None,
            handler,
        }
    }

    /// Whether this operation answers requests made with `verb`.
    #[must_use]
    pub fn allows(&self, verb: HttpVerb) -> bool {
        self.allowed_verbs.contains(&verb)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("allowed_verbs", &self.allowed_verbs)
            .field("enabled", &self.enabled)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Everything a handler may consult while executing.
#[derive(Clone)]
pub struct ExecutionContext {
    pub call_id: u64,
    pub service: Arc<CswService>,
    pub repository: Arc<dyn RepositoryLookup>,
    pub config: Arc<ServerConfig>,
}

/// A resolved request ready to travel through the execution pipeline.
#[derive(Debug, Clone)]
pub struct OperationCall {
    pub call_id: u64,
    pub call_timeout_ms: u64,
    /// Server settings of the snapshot the request was resolved against.
    pub config: Arc<ServerConfig>,
    pub resolution: Resolution,
}

/// Successful result of an operation handler.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationResponse {
    Capabilities(CapabilitiesDocument),
    Records {
        records: Vec<Record>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fan_out: Option<FanOutPlan>,
    },
}

/// Errors returned by operation handlers and the execution pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("service {service} {version} is at its concurrency limit, try again later")]
    ServiceBusy { service: String, version: String },
    #[error("operation {operation} is not implemented")]
    NotImplemented { operation: String },
    #[error("none of the requested versions {requested:?} is supported (server speaks {supported})")]
    VersionNegotiationFailed {
        requested: Vec<String>,
        supported: String,
    },
    #[error("handler for {expected} received {actual} parameters")]
    WrongParameters {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

impl OperationError {
    /// Protocol exception code for this failure.
    #[must_use]
    pub fn code(&self) -> ExceptionCode {
        match self {
            Self::NotImplemented { .. } => ExceptionCode::OperationNotSupported,
            Self::VersionNegotiationFailed { .. } => ExceptionCode::VersionNegotiationFailed,
            Self::Timeout { .. }
            | Self::Overloaded
            | Self::ServiceBusy { .. }
            | Self::WrongParameters { .. }
            | Self::Repository(_) => ExceptionCode::NoApplicableCode,
        }
    }

    /// Builds the exception report handed to the transport layer.
    #[must_use]
    pub fn report(&self) -> ExceptionReport {
        let locator = match self {
            Self::NotImplemented { operation } | Self::Timeout { operation, .. } => {
                Some(operation.clone())
            }
            Self::VersionNegotiationFailed { .. } => Some("AcceptVersions".to_string()),
            _ => None,
        };
        ExceptionReport {
            version: OWS_EXCEPTION_VERSION.to_string(),
            code: self.code(),
            locator,
            text: self.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Why an operation was reported as not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSupportedReason {
    /// Absent from the service's registry, or present but disabled.
    Unavailable,
    /// Present and enabled, but not bound to the request's HTTP method.
    VerbNotAllowed(HttpVerb),
}

impl fmt::Display for NotSupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => Ok(()),
            Self::VerbNotAllowed(verb) => write!(f, " via {verb}"),
        }
    }
}

/// Terminal failure of request resolution.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    MalformedRequest(#[source] MalformedRequest),
    #[error("no configured service accepts the request")]
    NoApplicableService,
    #[error("service {service} has no schema processor for the request")]
    NoApplicableSchema { service: String },
    #[error("operation {name} is not supported{reason}")]
    OperationNotSupported {
        name: String,
        reason: NotSupportedReason,
    },
    #[error("no parameter parsing rule for operation {name}")]
    UnsupportedOperation { name: String },
    #[error("missing value for parameter {locator}")]
    MissingParameterValue { locator: String },
    #[error("invalid value {value:?} for parameter {locator}")]
    InvalidParameterValue { locator: String, value: String },
    #[error("internal error: {0}")]
    NoApplicableCode(#[source] anyhow::Error),
}

impl DispatchError {
    /// Protocol exception code for this failure.
    #[must_use]
    pub fn code(&self) -> ExceptionCode {
        match self {
            Self::NoApplicableService
            | Self::NoApplicableSchema { .. }
            | Self::OperationNotSupported { .. }
            | Self::UnsupportedOperation { .. } => ExceptionCode::OperationNotSupported,
            Self::MissingParameterValue { .. } => ExceptionCode::MissingParameterValue,
            Self::InvalidParameterValue { .. } => ExceptionCode::InvalidParameterValue,
            Self::MalformedRequest(_) | Self::NoApplicableCode(_) => {
                ExceptionCode::NoApplicableCode
            }
        }
    }

    /// Parameter or operation the failure points at, when known.
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::OperationNotSupported { name, .. } | Self::UnsupportedOperation { name } => {
                Some(name)
            }
            Self::MissingParameterValue { locator }
            | Self::InvalidParameterValue { locator, .. } => Some(locator),
            Self::NoApplicableService | Self::NoApplicableSchema { .. } => Some("request"),
            Self::MalformedRequest(_) | Self::NoApplicableCode(_) => None,
        }
    }

    /// Builds the exception report handed to the transport layer.
    #[must_use]
    pub fn report(&self) -> ExceptionReport {
        ExceptionReport {
            version: OWS_EXCEPTION_VERSION.to_string(),
            code: self.code(),
            locator: self.locator().map(str::to_string),
            text: self.to_string(),
        }
    }
}
