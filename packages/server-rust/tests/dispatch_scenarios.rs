//! End-to-end dispatch scenarios: raw request in, resolution or exception
//! report out, plus execution through the tower pipeline.

use std::sync::Arc;

use bytes::Bytes;
use csw_core::{
    DistributedSearchPolicy, ExceptionCode, GetCapabilitiesParameters, HttpVerb, Parameters,
    RawRequest, Record,
};
use csw_server::service::{
    build_operation_pipeline, resolve, CswService, Deployment, DeploymentConfig,
    DeploymentHandle, DispatchError, Dispatcher, NotSupportedReason, OperationExecutor,
    OperationResponse,
};
use csw_server::{InMemoryRepository, RepositoryLookup};
use proptest::prelude::*;
use tower::ServiceExt;

fn services(json: &str) -> Vec<Arc<CswService>> {
    Deployment::from_config(&DeploymentConfig::from_json(json).unwrap())
        .unwrap()
        .services()
        .to_vec()
}

fn default_csw() -> Vec<Arc<CswService>> {
    services(r#"{"services": [{"name": "CSW", "version": "2.0.2", "is_default": true}]}"#)
}

fn kvp(pairs: &[(&str, &str)]) -> RawRequest {
    RawRequest::Pairs(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_get_capabilities_with_no_optional_parameters() {
    let resolution = resolve(
        HttpVerb::Get,
        kvp(&[("request", "GetCapabilities"), ("service", "CSW"), ("version", "2.0.2")]),
        &default_csw(),
    )
    .unwrap();
    assert_eq!(resolution.operation.name, "GetCapabilities");
    assert_eq!(
        resolution.parameters,
        Parameters::GetCapabilities(GetCapabilitiesParameters {
            sections: None,
            accept_versions: None,
            accept_formats: None,
            update_sequence: None,
        })
    );
}

#[test]
fn scenario_b_get_record_by_id_splits_ids() {
    let resolution = resolve(
        HttpVerb::Get,
        kvp(&[
            ("request", "GetRecordById"),
            ("Id", "abc,def"),
            ("service", "CSW"),
            ("version", "2.0.2"),
        ]),
        &default_csw(),
    )
    .unwrap();
    let Parameters::GetRecordById(params) = resolution.parameters else {
        panic!("expected GetRecordById parameters");
    };
    assert_eq!(params.id, vec!["abc", "def"]);
}

#[test]
fn scenario_c_versionless_request_uses_default_service() {
    let resolution = resolve(
        HttpVerb::Get,
        kvp(&[("request", "GetCapabilities"), ("service", "CSW")]),
        &default_csw(),
    )
    .unwrap();
    assert_eq!(resolution.service.name(), "CSW");
    assert_eq!(resolution.service.version(), "2.0.2");
}

#[test]
fn scenario_d_structured_body_for_unknown_service() {
    let body = r#"<csw:GetCapabilities xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" service="WMS" version="2.0.2"/>"#;
    let err = resolve(
        HttpVerb::Post,
        RawRequest::Body(Bytes::from(body)),
        &default_csw(),
    )
    .unwrap_err();
    assert!(matches!(err, DispatchError::NoApplicableService));
    assert_eq!(err.report().code, ExceptionCode::OperationNotSupported);
}

#[test]
fn scenario_e_zero_hop_count_never_fans_out() {
    let policy = DistributedSearchPolicy {
        enabled: true,
        remote_catalogues: Vec::new(),
        hop_count: 0,
    };
    assert!(!policy.should_fan_out());
}

#[test]
fn structured_body_resolves_like_kvp() {
    let body = r#"<csw:GetRecordById xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" service="CSW" version="2.0.2">
        <csw:Id>abc</csw:Id><csw:Id>def</csw:Id>
    </csw:GetRecordById>"#;
    let from_body = resolve(HttpVerb::Post, RawRequest::Body(Bytes::from(body)), &default_csw()).unwrap();
    let from_kvp = resolve(
        HttpVerb::Post,
        RawRequest::Query("request=GetRecordById&service=CSW&version=2.0.2&Id=abc,def".into()),
        &default_csw(),
    )
    .unwrap();
    assert_eq!(from_body.parameters, from_kvp.parameters);
}

#[test]
fn missing_id_reports_missing_parameter_value() {
    let err = resolve(
        HttpVerb::Get,
        kvp(&[("request", "GetRecordById"), ("service", "CSW"), ("version", "2.0.2")]),
        &default_csw(),
    )
    .unwrap_err();
    let report = err.report();
    assert_eq!(report.code, ExceptionCode::MissingParameterValue);
    assert_eq!(report.locator.as_deref(), Some("Id"));
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_and_execute_get_record_by_id() {
    let deployment = Deployment::from_config(
        &DeploymentConfig::from_json(r#"{"services": [{"version": "2.0.2", "is_default": true}]}"#)
            .unwrap(),
    )
    .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(DeploymentHandle::new(deployment)));

    let repository = Arc::new(InMemoryRepository::new());
    repository.create_schema().await.unwrap();
    repository.insert(Record::new("abc", "A record"));

    let call = dispatcher
        .dispatch(
            HttpVerb::Get,
            RawRequest::Query("service=CSW&request=GetRecordById&Id=abc,zzz".into()),
        )
        .unwrap();
    let config = Arc::clone(&call.config);
    let pipeline = build_operation_pipeline(OperationExecutor::new(repository), &config);

    let OperationResponse::Records { records, fan_out } = pipeline.oneshot(call).await.unwrap() else {
        panic!("expected records");
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "A record");
    assert!(fan_out.is_none());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn version() -> impl Strategy<Value = String> {
    (1u8..4, 0u8..3, 0u8..3).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"))
}

proptest! {
    #[test]
    fn first_exact_match_wins(versions in prop::collection::vec(version(), 1..6), pick in any::<prop::sample::Index>()) {
        let entries: Vec<String> = versions
            .iter()
            .enumerate()
            .map(|(i, v)| format!(r#"{{"version": "{v}", "url_path": "/{i}"}}"#))
            .collect();
        let svcs = services(&format!(r#"{{"services": [{}]}}"#, entries.join(",")));
        let wanted = &versions[pick.index(versions.len())];

        let resolution = resolve(
            HttpVerb::Get,
            kvp(&[("request", "GetCapabilities"), ("service", "CSW"), ("version", wanted.as_str())]),
            &svcs,
        )
        .unwrap();

        let first = versions.iter().position(|v| v == wanted).unwrap();
        prop_assert!(Arc::ptr_eq(&resolution.service, &svcs[first]));
    }

    #[test]
    fn versionless_selects_default_only_on_name_match(
        name in prop::sample::select(vec!["CSW", "csw", "WMS", "OAI"]),
        has_default in any::<bool>(),
    ) {
        let svcs = services(&format!(
            r#"{{"services": [{{"version": "3.0.0"}}, {{"version": "2.0.2", "is_default": {has_default}}}]}}"#
        ));
        let result = resolve(
            HttpVerb::Get,
            kvp(&[("request", "GetCapabilities"), ("service", name)]),
            &svcs,
        );
        if has_default && name == "CSW" {
            let resolved = result.unwrap();
            prop_assert_eq!(resolved.service.version(), "2.0.2");
        } else {
            prop_assert!(matches!(result, Err(DispatchError::NoApplicableService)));
        }
    }

    #[test]
    fn resolution_is_idempotent(
        operation in prop::sample::select(vec!["GetCapabilities", "GetRecordById", "GetRecords", "Harvest"]),
        version in prop::option::of(prop::sample::select(vec!["2.0.2", "3.0.0"])),
        ids in "[a-z,]{0,12}",
        post in any::<bool>(),
    ) {
        let svcs = default_csw();
        let verb = if post { HttpVerb::Post } else { HttpVerb::Get };
        let mut pairs = vec![("request", operation), ("service", "CSW"), ("Id", ids.as_str())];
        if let Some(version) = version {
            pairs.push(("version", version));
        }

        let first = resolve(verb, kvp(&pairs), &svcs);
        let second = resolve(verb, kvp(&pairs), &svcs);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert!(Arc::ptr_eq(&a.service, &b.service));
                prop_assert_eq!(a.operation.name, b.operation.name);
                prop_assert_eq!(a.parameters, b.parameters);
            }
            (Err(a), Err(b)) => {
                prop_assert_eq!(a.report(), b.report());
            }
            _ => prop_assert!(false, "outcomes differ"),
        }
    }

    #[test]
    fn disabled_operation_never_falls_through(count in 2usize..5) {
        let mut entries = vec![
            r#"{"version": "2.0.2", "operations": [{"name": "GetRecordById", "enabled": false}]}"#.to_string(),
        ];
        entries.extend((1..count).map(|_| r#"{"version": "2.0.2"}"#.to_string()));
        let svcs = services(&format!(r#"{{"services": [{}]}}"#, entries.join(",")));

        let err = resolve(
            HttpVerb::Get,
            kvp(&[("request", "GetRecordById"), ("service", "CSW"), ("version", "2.0.2"), ("Id", "x")]),
            &svcs,
        )
        .unwrap_err();
        prop_assert!(
            matches!(
                err,
                DispatchError::OperationNotSupported { reason: NotSupportedReason::Unavailable, .. }
            ),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn verb_outside_allowed_set_is_rejected(post_only in any::<bool>()) {
        let (allowed, used) = if post_only {
            ("POST", HttpVerb::Get)
        } else {
            ("GET", HttpVerb::Post)
        };
        let svcs = services(&format!(
            r#"{{"services": [{{"version": "2.0.2", "operations": [{{"name": "GetCapabilities", "allowed_verbs": ["{allowed}"]}}]}}]}}"#
        ));
        let err = resolve(
            used,
            kvp(&[("request", "GetCapabilities"), ("service", "CSW"), ("version", "2.0.2")]),
            &svcs,
        )
        .unwrap_err();
        prop_assert_eq!(err.code(), ExceptionCode::OperationNotSupported);
    }
}
