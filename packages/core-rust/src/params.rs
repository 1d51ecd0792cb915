//! Typed operation parameters produced by schema processors.

use serde::{Deserialize, Serialize};

/// Well-known operation names of the catalogue protocol.
pub mod operation_names {
    pub const GET_CAPABILITIES: &str = "GetCapabilities";
    pub const GET_RECORD_BY_ID: &str = "GetRecordById";
}

/// Parameters of a `GetCapabilities` request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCapabilitiesParameters {
    pub sections: Option<Vec<String>>,
    pub accept_versions: Option<Vec<String>>,
    pub accept_formats: Option<Vec<String>>,
    pub update_sequence: Option<String>,
}

/// Parameters of a `GetRecordById` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRecordByIdParameters {
    /// Requested identifiers, in request order. Never empty.
    pub id: Vec<String>,
    pub element_set_name: Option<String>,
    pub output_format: Option<String>,
    pub output_schema: Option<String>,
}

/// Parsed parameters for one resolved operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Parameters {
    GetCapabilities(GetCapabilitiesParameters),
    GetRecordById(GetRecordByIdParameters),
}

impl Parameters {
    /// Protocol name of the operation these parameters belong to.
    #[must_use]
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::GetCapabilities(_) => operation_names::GET_CAPABILITIES,
            Self::GetRecordById(_) => operation_names::GET_RECORD_BY_ID,
        }
    }
}

/// Splits a comma-separated KVP list, trimming entries and dropping empty ones.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
