//! `GetCapabilities`: describes a service, its operations, and where to call
//! them.

use std::collections::BTreeSet;

use async_trait::async_trait;
use csw_core::{DistributedSearchPolicy, HttpVerb, Parameters};
use serde::Serialize;
use tracing::debug;

use crate::service::config::ServerConfig;
use crate::service::csw::CswService;
use crate::service::operation::{
    ExecutionContext, OperationError, OperationHandler, OperationResponse,
};

const SECTION_ALL: &str = "All";
const SECTION_SERVICE_IDENTIFICATION: &str = "ServiceIdentification";
const SECTION_OPERATIONS_METADATA: &str = "OperationsMetadata";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Capabilities of one service. Sections the client did not ask for are
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitiesDocument {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_identification: Option<ServiceIdentification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations_metadata: Option<OperationsMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceIdentification {
    pub service_type: String,
    pub service_type_version: String,
    pub title: String,
    pub r#abstract: String,
    pub keywords: Vec<String>,
    pub fees: String,
    pub access_constraints: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationsMetadata {
    pub operations: Vec<OperationMetadata>,
    /// Record type names served by any schema processor.
    pub type_names: Vec<String>,
    /// Queryable names across every schema processor.
    pub queryables: Vec<String>,
    pub distributed_search: DistributedSearchPolicy,
}

/// One enabled operation and its invocation URLs per HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationMetadata {
    pub name: String,
    pub get: Vec<String>,
    pub post: Vec<String>,
}

impl CapabilitiesDocument {
    /// Builds the requested sections for `service`. `None` or a list
    /// containing `All` selects every section.
    #[must_use]
    pub fn build(service: &CswService, config: &ServerConfig, sections: Option<&[String]>) -> Self {
        let wants = |section: &str| match sections {
            None => true,
            Some(list) => list
                .iter()
                .any(|s| s.eq_ignore_ascii_case(SECTION_ALL) || s.eq_ignore_ascii_case(section)),
        };

        Self {
            version: service.version().to_string(),
            service_identification: wants(SECTION_SERVICE_IDENTIFICATION)
                .then(|| service_identification(service)),
            operations_metadata: wants(SECTION_OPERATIONS_METADATA)
                .then(|| operations_metadata(service, config)),
        }
    }
}

fn service_identification(service: &CswService) -> ServiceIdentification {
    let metadata = service.metadata();
    ServiceIdentification {
        service_type: service.name().to_string(),
        service_type_version: service.version().to_string(),
        title: metadata.title.clone(),
        r#abstract: metadata.r#abstract.clone(),
        keywords: metadata.keywords.clone(),
        fees: metadata.fees.clone(),
        access_constraints: metadata.access_constraints.clone(),
    }
}

fn operations_metadata(service: &CswService, config: &ServerConfig) -> OperationsMetadata {
    let endpoints = service.endpoints(&config.public_hosts, &config.site_name);
    let operations = service
        .operations()
        .enabled()
        .map(|op| {
            let urls = |verb: HttpVerb| -> Vec<String> {
                endpoints
                    .iter()
                    .filter(|e| e.operation == op.name && e.verb == verb)
                    .map(|e| e.url.clone())
                    .collect()
            };
            OperationMetadata {
                name: op.name.clone(),
                get: urls(HttpVerb::Get),
                post: urls(HttpVerb::Post),
            }
        })
        .collect();

    let mut type_names = Vec::new();
    let mut queryables = BTreeSet::new();
    for processor in service.processors() {
        let settings = processor.settings();
        for type_name in &settings.type_names {
            if !type_names.contains(type_name) {
                type_names.push(type_name.clone());
            }
        }
        queryables.extend(settings.record_mapping.keys().cloned());
    }

    OperationsMetadata {
        operations,
        type_names,
        queryables: queryables.into_iter().collect(),
        distributed_search: service.distributed_search().clone(),
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Answers `GetCapabilities` requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCapabilitiesHandler;

#[async_trait]
impl OperationHandler for GetCapabilitiesHandler {
    async fn handle(
        &self,
        ctx: &ExecutionContext,
        parameters: Parameters,
    ) -> Result<OperationResponse, OperationError> {
        let actual = parameters.operation_name();
        let Parameters::GetCapabilities(params) = parameters else {
            return Err(OperationError::WrongParameters {
                expected: "GetCapabilities",
                actual,
            });
        };

        let version = ctx.service.version();
        if let Some(requested) = params.accept_versions.filter(|v| !v.is_empty()) {
            if !requested.iter().any(|v| v == version) {
                debug!(call_id = ctx.call_id, ?requested, version, "version negotiation failed");
                return Err(OperationError::VersionNegotiationFailed {
                    requested,
                    supported: version.to_string(),
                });
            }
        }

        Ok(OperationResponse::Capabilities(CapabilitiesDocument::build(
            &ctx.service,
            &ctx.config,
            params.sections.as_deref(),
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
