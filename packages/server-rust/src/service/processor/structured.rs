//! XML request body processor.

use anyhow::anyhow;
use csw_core::{
    operation_names, Encoding, GeneralRequestInfo, GetCapabilitiesParameters,
    GetRecordByIdParameters, MalformedRequest, Parameters, RequestEnvelope, SchemaSettings,
    XmlElement, OWS_NAMESPACE,
};

use super::{check_element_set, ParameterError, SchemaProcessor};

/// Reads requests posted as XML documents.
///
/// The operation is the root element's local name; `service` and `version`
/// are root attributes. A namespaced root must belong to this processor's
/// schema namespace.
#[derive(Debug, Clone)]
pub struct StructuredBodySchemaProcessor {
    settings: SchemaSettings,
}

/// OWS common elements are either qualified with the OWS namespace or left
/// unqualified.
fn is_ows(element: &XmlElement) -> bool {
    matches!(element.namespace.as_deref(), None | Some(OWS_NAMESPACE))
}

/// Text of every OWS `item` under the first OWS `list` child of `root`.
fn ows_list(root: &XmlElement, list: &str, item: &str) -> Option<Vec<String>> {
    root.children_named(list).find(|e| is_ows(e)).map(|element| {
        element
            .children_named(item)
            .filter(|e| is_ows(e))
            .filter_map(XmlElement::text)
            .map(str::to_string)
            .collect()
    })
}

impl StructuredBodySchemaProcessor {
    #[must_use]
    pub fn new(settings: SchemaSettings) -> Self {
        Self { settings }
    }

    fn get_capabilities(root: &XmlElement) -> GetCapabilitiesParameters {
        GetCapabilitiesParameters {
            sections: ows_list(root, "Sections", "Section"),
            accept_versions: ows_list(root, "AcceptVersions", "Version"),
            accept_formats: ows_list(root, "AcceptFormats", "OutputFormat"),
            update_sequence: root.attribute("updateSequence").map(str::to_string),
        }
    }

    fn get_record_by_id(&self, root: &XmlElement) -> Result<GetRecordByIdParameters, ParameterError> {
        let id: Vec<String> = root
            .children_named("Id")
            .filter_map(XmlElement::text)
            .map(str::to_string)
            .collect();
        if id.is_empty() {
            return Err(ParameterError::MissingParameterValue { locator: "Id" });
        }
        Ok(GetRecordByIdParameters {
            id,
            element_set_name: check_element_set(
                &self.settings,
                root.child("ElementSetName")
                    .and_then(XmlElement::text)
                    .map(str::to_string),
            )?,
            output_format: root.attribute("outputFormat").map(str::to_string),
            output_schema: root.attribute("outputSchema").map(str::to_string),
        })
    }
}

impl SchemaProcessor for StructuredBodySchemaProcessor {
    fn encoding(&self) -> Encoding {
        Encoding::StructuredBody
    }

    fn settings(&self) -> &SchemaSettings {
        &self.settings
    }

    fn parse_general_info(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<GeneralRequestInfo, MalformedRequest> {
        let root = envelope
            .document()
            .ok_or(MalformedRequest::EncodingMismatch {
                expected: Encoding::StructuredBody,
                actual: envelope.encoding(),
            })?;
        if let Some(namespace) = root.namespace.as_deref() {
            if namespace != self.settings.namespace {
                return Err(MalformedRequest::NamespaceMismatch {
                    expected: self.settings.namespace.clone(),
                    actual: namespace.to_string(),
                });
            }
        }
        let service_name = root
            .attribute("service")
            .ok_or(MalformedRequest::Missing {
                kind: "attribute",
                name: "service",
            })?;
        Ok(GeneralRequestInfo {
            operation_name: root.name.clone(),
            service_name: service_name.to_string(),
            protocol_version: root.attribute("version").map(str::to_string),
        })
    }

    fn parse_operation_parameters(
        &self,
        envelope: &RequestEnvelope,
        operation_name: &str,
    ) -> Result<Parameters, ParameterError> {
        let root = envelope
            .document()
            .ok_or_else(|| anyhow!("{operation_name} parameters requested from a KVP envelope"))?;
        match operation_name {
            operation_names::GET_CAPABILITIES => {
                Ok(Parameters::GetCapabilities(Self::get_capabilities(root)))
            }
            operation_names::GET_RECORD_BY_ID => {
                Ok(Parameters::GetRecordById(self.get_record_by_id(root)?))
            }
            other => Err(ParameterError::UnsupportedOperation {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use csw_core::CSW_202_NAMESPACE;

    use super::*;

    fn processor() -> StructuredBodySchemaProcessor {
        StructuredBodySchemaProcessor::new(SchemaSettings::default())
    }

    fn envelope(xml: &str) -> RequestEnvelope {
        RequestEnvelope::from_xml(xml.as_bytes()).unwrap()
    }

    #[test]
    fn general_info_from_root_element() {
        let env = envelope(&format!(
            r#"<csw:GetRecordById xmlns:csw="{CSW_202_NAMESPACE}" service="CSW" version="2.0.2"><csw:Id>a</csw:Id></csw:GetRecordById>"#
        ));
        let info = processor().parse_general_info(&env).unwrap();
        assert_eq!(info.operation_name, "GetRecordById");
        assert_eq!(info.service_name, "CSW");
        assert_eq!(info.protocol_version.as_deref(), Some("2.0.2"));
    }

    #[test]
    fn unqualified_root_is_accepted() {
        let env = envelope(r#"<GetCapabilities service="CSW"/>"#);
        let info = processor().parse_general_info(&env).unwrap();
        assert_eq!(info.operation_name, "GetCapabilities");
        assert!(info.protocol_version.is_none());
    }

    #[test]
    fn foreign_namespace_is_rejected() {
        let env = envelope(r#"<GetCapabilities xmlns="http://www.opengis.net/cat/csw/3.0" service="CSW"/>"#);
        let err = processor().parse_general_info(&env).unwrap_err();
        assert!(matches!(err, MalformedRequest::NamespaceMismatch { .. }));
    }

    #[test]
    fn missing_service_attribute_is_malformed() {
        let env = envelope(r#"<GetCapabilities version="2.0.2"/>"#);
        let err = processor().parse_general_info(&env).unwrap_err();
        assert!(matches!(err, MalformedRequest::Missing { kind: "attribute", name: "service" }));
    }

    #[test]
    fn kvp_envelope_is_rejected() {
        let env = RequestEnvelope::from_query("request=GetCapabilities&service=CSW");
        let err = processor().parse_general_info(&env).unwrap_err();
        assert!(matches!(err, MalformedRequest::EncodingMismatch { .. }));
    }

    #[test]
    fn get_capabilities_reads_ows_lists() {
        let env = envelope(&format!(
            r#"<csw:GetCapabilities xmlns:csw="{CSW_202_NAMESPACE}" xmlns:ows="{OWS_NAMESPACE}" service="CSW" updateSequence="3">
                 <ows:AcceptVersions><ows:Version>2.0.2</ows:Version><ows:Version>2.0.1</ows:Version></ows:AcceptVersions>
                 <ows:Sections><ows:Section>OperationsMetadata</ows:Section></ows:Sections>
                 <ows:AcceptFormats><ows:OutputFormat>application/xml</ows:OutputFormat></ows:AcceptFormats>
               </csw:GetCapabilities>"#
        ));
        let params = processor()
            .parse_operation_parameters(&env, "GetCapabilities")
            .unwrap();
        assert_eq!(
            params,
            Parameters::GetCapabilities(GetCapabilitiesParameters {
                sections: Some(vec!["OperationsMetadata".into()]),
                accept_versions: Some(vec!["2.0.2".into(), "2.0.1".into()]),
                accept_formats: Some(vec!["application/xml".into()]),
                update_sequence: Some("3".into()),
            })
        );
    }

    #[test]
    fn ows_lists_from_other_namespaces_are_ignored() {
        let env = envelope(&format!(
            r#"<csw:GetCapabilities xmlns:csw="{CSW_202_NAMESPACE}" xmlns:ows="{OWS_NAMESPACE}" xmlns:x="urn:example" service="CSW">
                 <x:AcceptVersions><x:Version>9.9.9</x:Version></x:AcceptVersions>
                 <AcceptVersions><Version>2.0.2</Version><x:Version>9.9.9</x:Version></AcceptVersions>
                 <x:Sections><ows:Section>All</ows:Section></x:Sections>
               </csw:GetCapabilities>"#
        ));
        let Parameters::GetCapabilities(params) = processor()
            .parse_operation_parameters(&env, "GetCapabilities")
            .unwrap()
        else {
            panic!("expected GetCapabilities parameters");
        };
        assert_eq!(params.accept_versions, Some(vec!["2.0.2".to_string()]));
        assert!(params.sections.is_none());
    }

    #[test]
    fn get_record_by_id_reads_id_children() {
        let env = envelope(&format!(
            r#"<csw:GetRecordById xmlns:csw="{CSW_202_NAMESPACE}" service="CSW" version="2.0.2" outputFormat="application/xml">
                 <csw:Id>abc</csw:Id>
                 <csw:Id> def </csw:Id>
                 <csw:ElementSetName>summary</csw:ElementSetName>
               </csw:GetRecordById>"#
        ));
        let Parameters::GetRecordById(params) = processor()
            .parse_operation_parameters(&env, "GetRecordById")
            .unwrap()
        else {
            panic!("expected GetRecordById parameters");
        };
        assert_eq!(params.id, vec!["abc", "def"]);
        assert_eq!(params.element_set_name.as_deref(), Some("summary"));
        assert_eq!(params.output_format.as_deref(), Some("application/xml"));
        assert!(params.output_schema.is_none());
    }

    #[test]
    fn get_record_by_id_without_ids_is_missing_parameter() {
        let env = envelope(r#"<GetRecordById service="CSW"/>"#);
        let err = processor()
            .parse_operation_parameters(&env, "GetRecordById")
            .unwrap_err();
        assert!(matches!(err, ParameterError::MissingParameterValue { locator: "Id" }));
    }

    #[test]
    fn kvp_envelope_at_parameter_stage_is_internal() {
        let env = RequestEnvelope::from_query("request=GetCapabilities&service=CSW");
        let err = processor()
            .parse_operation_parameters(&env, "GetCapabilities")
            .unwrap_err();
        assert!(matches!(err, ParameterError::Internal(_)));
    }

    #[test]
    fn unknown_operation_is_unsupported() {
        let env = envelope(r#"<Harvest service="CSW"/>"#);
        let err = processor().parse_operation_parameters(&env, "Harvest").unwrap_err();
        assert!(matches!(err, ParameterError::UnsupportedOperation { .. }));
    }
}
