//! Machine-readable protocol exception codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// OWS exception codes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionCode {
    OperationNotSupported,
    MissingParameterValue,
    InvalidParameterValue,
    VersionNegotiationFailed,
    NoApplicableCode,
}

impl ExceptionCode {
    /// The code exactly as it appears in an exception report.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OperationNotSupported => "OperationNotSupported",
            Self::MissingParameterValue => "MissingParameterValue",
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::VersionNegotiationFailed => "VersionNegotiationFailed",
            Self::NoApplicableCode => "NoApplicableCode",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure handed to the transport layer for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionReport {
    /// Protocol version the report is expressed in.
    pub version: String,
    pub code: ExceptionCode,
    /// Name of the offending parameter or operation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    pub text: String,
}
