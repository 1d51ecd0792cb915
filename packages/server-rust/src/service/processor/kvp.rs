//! Key-value-pair request processor.

use csw_core::params::split_list;
use csw_core::{
    operation_names, Encoding, GeneralRequestInfo, GetCapabilitiesParameters,
    GetRecordByIdParameters, MalformedRequest, Parameters, RequestEnvelope, SchemaSettings,
};

use super::{check_element_set, ParameterError, SchemaProcessor};

/// Reads requests encoded as query-string fields.
#[derive(Debug, Clone)]
pub struct KvpSchemaProcessor {
    settings: SchemaSettings,
}

impl KvpSchemaProcessor {
    #[must_use]
    pub fn new(settings: SchemaSettings) -> Self {
        Self { settings }
    }

    fn get_capabilities(envelope: &RequestEnvelope) -> GetCapabilitiesParameters {
        GetCapabilitiesParameters {
            sections: envelope.field("sections").map(split_list),
            accept_versions: envelope.field("acceptVersions").map(split_list),
            accept_formats: envelope.field("acceptFormats").map(split_list),
            update_sequence: envelope.field("updateSequence").map(str::to_string),
        }
    }

    fn get_record_by_id(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<GetRecordByIdParameters, ParameterError> {
        let id = envelope.field("Id").map(split_list).unwrap_or_default();
        if id.is_empty() {
            return Err(ParameterError::MissingParameterValue { locator: "Id" });
        }
        Ok(GetRecordByIdParameters {
            id,
            element_set_name: check_element_set(
                &self.settings,
                envelope.field("ElementSetName").map(str::to_string),
            )?,
            output_format: envelope.field("outputFormat").map(str::to_string),
            output_schema: envelope.field("outputSchema").map(str::to_string),
        })
    }
}

impl SchemaProcessor for KvpSchemaProcessor {
    fn encoding(&self) -> Encoding {
        Encoding::Kvp
    }

    fn settings(&self) -> &SchemaSettings {
        &self.settings
    }

    fn parse_general_info(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<GeneralRequestInfo, MalformedRequest> {
        if envelope.encoding() != Encoding::Kvp {
            return Err(MalformedRequest::EncodingMismatch {
                expected: Encoding::Kvp,
                actual: envelope.encoding(),
            });
        }
        let required = |name: &'static str| {
            envelope
                .field(name)
                .map(str::to_string)
                .ok_or(MalformedRequest::Missing { kind: "field", name })
        };
        Ok(GeneralRequestInfo {
            operation_name: required("request")?,
            service_name: required("service")?,
            protocol_version: envelope.field("version").map(str::to_string),
        })
    }

    fn parse_operation_parameters(
        &self,
        envelope: &RequestEnvelope,
        operation_name: &str,
    ) -> Result<Parameters, ParameterError> {
        match operation_name {
            operation_names::GET_CAPABILITIES => {
                Ok(Parameters::GetCapabilities(Self::get_capabilities(envelope)))
            }
            operation_names::GET_RECORD_BY_ID => {
                Ok(Parameters::GetRecordById(self.get_record_by_id(envelope)?))
            }
            other => Err(ParameterError::UnsupportedOperation {
                name: other.to_string(),
            }),
        }
    }
}
