//! End-to-end pipeline tests over an in-memory transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::json;

use stratus::{
    ArgValue, ArgumentRole, BasicAuthFilter, Clock, CloudError, DecodedValue, EndpointStrategy,
    ErrorStrategy, FormSignerFilter, Invoker, OperationDescriptor, ProviderConfig,
    ResponseStrategy, StaticCredentials, Transport, TransportRequest, TransportResponse,
    VirtualHostFilter,
};

/// Transport that records requests and replays queued responses.
#[derive(Default)]
struct StubTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    seen: Mutex<Vec<TransportRequest>>,
}

impl StubTransport {
    fn respond(status: u16, body: &[u8]) -> Arc<Self> {
        let transport = Arc::new(Self::default());
        transport.push(status, body);
        transport
    }

    fn push(&self, status: u16, body: &[u8]) {
        self.responses.lock().unwrap().push_back(TransportResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_vec(),
        });
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, CloudError> {
        self.seen.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CloudError::Transport("no queued response".to_string()))
    }
}

/// Transport that signals entry and then never completes.
struct HangingTransport {
    entered: tokio::sync::Notify,
}

#[async_trait]
impl Transport for HangingTransport {
    async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse, CloudError> {
        self.entered.notify_one();
        futures::future::pending::<()>().await;
        unreachable!()
    }
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn monitoring_invoker(transport: Arc<dyn Transport>) -> Invoker {
    let credentials = Arc::new(StaticCredentials::new("AKID", "s3cr3t"));
    let signer = FormSignerFilter::new(credentials).with_clock(Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2009, 11, 8, 15, 54, 8).unwrap(),
    )));
    let config = ProviderConfig::new("monitoring", "https://monitoring.us-east-1.amazonaws.com")
        .with_region("eu-west-1", "https://monitoring.eu-west-1.amazonaws.com")
        .with_form_constant("Version", "2010-08-01");
    Invoker::builder(config, transport)
        .filter(Arc::new(signer))
        .filter(Arc::new(VirtualHostFilter))
        .operation(
            OperationDescriptor::builder("GetMetricStatistics", Method::POST, "/")
                .form_constant("Action", "GetMetricStatistics")
                .arg(ArgumentRole::EndpointTarget)
                .arg(ArgumentRole::FormParam("MetricName".to_string()))
                .arg(ArgumentRole::FormParam("Namespace".to_string()))
                .arg(ArgumentRole::FormParam("StartTime".to_string()))
                .arg(ArgumentRole::FormParam("EndTime".to_string()))
                .arg(ArgumentRole::FormParam("Period".to_string()))
                .arg(ArgumentRole::FormParam("Statistics.member.1".to_string()))
                .endpoint(EndpointStrategy::Lookup)
                .response(ResponseStrategy::Document)
                .filter("form-signer")
                .filter("virtual-host")
                .build(),
        )
        .unwrap()
        .operation(
            OperationDescriptor::builder("MonitorInstances", Method::POST, "/")
                .form_constant("Action", "MonitorInstances")
                .arg(ArgumentRole::EndpointTarget)
                .arg(ArgumentRole::FormParam("InstanceId.0".to_string()))
                .arg(ArgumentRole::IndexedFormParams("InstanceId".to_string()))
                .endpoint(EndpointStrategy::Lookup)
                .response(ResponseStrategy::Document)
                .filter("form-signer")
                .build(),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn metric_args() -> Vec<ArgValue> {
    let at = Utc.timestamp_opt(10_000, 0).unwrap();
    vec![
        ArgValue::Absent, // region: use the provider default
        ArgValue::from("CPUUtilization"),
        ArgValue::from("AWS/EC2"),
        ArgValue::timestamp(at),
        ArgValue::timestamp(at),
        ArgValue::from(60i64),
        ArgValue::from("Average"),
    ]
}

const METRIC_BODY: &str = "Action=GetMetricStatistics\
&EndTime=1970-01-01T02%3A46%3A40Z\
&MetricName=CPUUtilization\
&Namespace=AWS%2FEC2\
&Period=60\
&StartTime=1970-01-01T02%3A46%3A40Z\
&Statistics.member.1=Average\
&Version=2010-08-01";

#[test]
fn get_metric_statistics_binds_a_canonical_form_body() {
    let invoker = monitoring_invoker(Arc::new(StubTransport::default()));
    let request = invoker.prepare("GetMetricStatistics", &metric_args()).unwrap();

    assert_eq!(request.url(), "https://monitoring.us-east-1.amazonaws.com/");
    assert_eq!(
        request.header("host"),
        Some("monitoring.us-east-1.amazonaws.com")
    );
    assert_eq!(request.applied_filters(), ["form-signer", "virtual-host"]);
    let body = request.encoded_body().unwrap();
    assert_eq!(body.media_type, "application/x-www-form-urlencoded");
    assert_eq!(String::from_utf8(body.bytes).unwrap(), METRIC_BODY);
}

#[test]
fn identical_invocations_prepare_byte_identical_requests() {
    let invoker = monitoring_invoker(Arc::new(StubTransport::default()));
    let first = invoker.prepare("GetMetricStatistics", &metric_args()).unwrap();
    let second = invoker.prepare("GetMetricStatistics", &metric_args()).unwrap();

    assert_eq!(first.headers(), second.headers());
    assert_eq!(
        first.encoded_body().unwrap().bytes,
        second.encoded_body().unwrap().bytes
    );
    assert!(first.header("authorization").unwrap().contains("signature="));
}

#[tokio::test]
async fn monitor_instances_expands_indexed_ids_from_zero() {
    let transport = StubTransport::respond(200, br#"{"instancesSet": []}"#);
    let invoker = monitoring_invoker(transport.clone());

    let out = invoker
        .invoke(
            "MonitorInstances",
            &[
                ArgValue::from("eu-west-1"),
                ArgValue::from("i-911"),
                ArgValue::from(vec!["i-922".to_string(), "i-933".to_string()]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(out, DecodedValue::Json(json!({"instancesSet": []})));

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "https://monitoring.eu-west-1.amazonaws.com/");
    let body = String::from_utf8(sent[0].body.clone().unwrap()).unwrap();
    assert_eq!(
        body,
        "Action=MonitorInstances\
         &InstanceId.0=i-911&InstanceId.1=i-922&InstanceId.2=i-933\
         &Version=2010-08-01"
    );
}

#[tokio::test]
async fn unknown_region_fails_before_any_request_is_sent() {
    let transport = Arc::new(StubTransport::default());
    let invoker = monitoring_invoker(transport.clone());

    let err = invoker
        .invoke("MonitorInstances", &[
            ArgValue::from("mars-north-1"),
            ArgValue::from("i-911"),
            ArgValue::Absent,
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::UnresolvableEndpoint { .. }));
    assert!(transport.requests().is_empty());
}

fn archive_invoker(transport: Arc<dyn Transport>) -> Invoker {
    let credentials = Arc::new(StaticCredentials::new("apiuser", "apikey"));
    let config = ProviderConfig::new("glacier-like", "https://api.example.com");
    Invoker::builder(config, transport)
        .filter(Arc::new(BasicAuthFilter::new(credentials)))
        .operation(
            OperationDescriptor::builder("ListArchives", Method::GET, "/archive/list")
                .response(ResponseStrategy::Subtree("response.archives".to_string()))
                .on_error(ErrorStrategy::EmptyOnNotFound)
                .filter("basic-auth")
                .build(),
        )
        .unwrap()
        .operation(
            OperationDescriptor::builder("ArchiveDetails", Method::GET, "/archive/{name}/details")
                .arg(ArgumentRole::PathParam("name".to_string()))
                .response(ResponseStrategy::Subtree("response.details".to_string()))
                .on_error(ErrorStrategy::NullOnNotFound)
                .filter("basic-auth")
                .build(),
        )
        .unwrap()
        .operation(
            OperationDescriptor::builder("DeleteArchive", Method::POST, "/archive/delete")
                .arg(ArgumentRole::FormParam("username".to_string()))
                .response(ResponseStrategy::Void)
                .build(),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn subtree_decoding_selects_the_declared_key() {
    let body = br#"{"response": {"archives": [{"username": "a1"}, {"username": "a2"}]}}"#;
    let transport = StubTransport::respond(200, body);
    let invoker = archive_invoker(transport.clone());

    let out = invoker.invoke("ListArchives", &[]).await.unwrap();
    let archives = out.into_json().unwrap();
    assert_eq!(archives.as_array().unwrap().len(), 2);

    let sent = transport.requests();
    let auth = sent[0].headers.get("authorization").unwrap();
    assert!(auth.to_str().unwrap().starts_with("Basic "));
}

#[tokio::test]
async fn missing_item_lookup_recovers_as_null() {
    let transport = StubTransport::respond(404, b"not found");
    let invoker = archive_invoker(transport);

    let out = invoker
        .invoke("ArchiveDetails", &[ArgValue::from("nope")])
        .await
        .unwrap();
    assert!(out.is_null());
}

#[tokio::test]
async fn missing_listing_recovers_as_empty_collection() {
    let transport = StubTransport::respond(404, b"");
    let invoker = archive_invoker(transport);

    let out = invoker.invoke("ListArchives", &[]).await.unwrap();
    assert_eq!(out.into_json().unwrap().as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn recovering_strategies_still_propagate_other_statuses() {
    let transport = StubTransport::respond(500, br#"{"message": "boom"}"#);
    let invoker = archive_invoker(transport);

    let err = invoker
        .invoke("ArchiveDetails", &[ArgValue::from("x")])
        .await
        .unwrap_err();
    match err {
        CloudError::Api { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn void_operations_discard_the_body() {
    let transport = StubTransport::respond(200, b"anything at all");
    let invoker = archive_invoker(transport.clone());

    let out = invoker
        .invoke("DeleteArchive", &[ArgValue::from("apiuser")])
        .await
        .unwrap();
    assert_eq!(out, DecodedValue::Unit);
    let sent = transport.requests();
    assert_eq!(
        String::from_utf8(sent[0].body.clone().unwrap()).unwrap(),
        "username=apiuser"
    );
}

#[tokio::test]
async fn malformed_success_bodies_surface_decode_errors() {
    let transport = StubTransport::respond(200, b"<html>not json</html>");
    let invoker = archive_invoker(transport);

    let err = invoker.invoke("ListArchives", &[]).await.unwrap_err();
    assert!(matches!(err, CloudError::Decode(_)));
}

#[tokio::test]
async fn rejected_filters_prevent_the_send() {
    struct NoCreds;
    impl stratus::CredentialSource for NoCreds {
        fn credentials(&self) -> Result<stratus::Credentials, CloudError> {
            Err(CloudError::Configuration("credentials not loaded".to_string()))
        }
    }

    let transport = Arc::new(StubTransport::default());
    let config = ProviderConfig::new("p", "https://api.example.com");
    let invoker = Invoker::builder(config, transport.clone())
        .filter(Arc::new(BasicAuthFilter::new(Arc::new(NoCreds))))
        .operation(
            OperationDescriptor::builder("List", Method::GET, "/")
                .filter("basic-auth")
                .build(),
        )
        .unwrap()
        .build()
        .unwrap();

    let err = invoker.invoke("List", &[]).await.unwrap_err();
    assert!(matches!(err, CloudError::FilterRejected { .. }));
    assert!(transport.requests().is_empty());
}

#[test]
fn unknown_filter_reference_fails_at_assembly_time() {
    let config = ProviderConfig::new("p", "https://api.example.com");
    let err = Invoker::builder(config, Arc::new(StubTransport::default()))
        .operation(
            OperationDescriptor::builder("List", Method::GET, "/")
                .filter("does-not-exist")
                .build(),
        )
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, CloudError::Construction(_)));
}

#[test]
fn unknown_handler_reference_fails_at_assembly_time() {
    let config = ProviderConfig::new("p", "https://api.example.com");
    let err = Invoker::builder(config, Arc::new(StubTransport::default()))
        .operation(
            OperationDescriptor::builder("Describe", Method::GET, "/")
                .response(ResponseStrategy::Handler("missing".to_string()))
                .build(),
        )
        .unwrap()
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("unknown response handler"));
}

#[tokio::test]
async fn cancellation_before_send_prevents_the_request() {
    let transport = Arc::new(StubTransport::default());
    let invoker = archive_invoker(transport.clone());

    let handle = invoker.spawn("ListArchives", vec![]);
    handle.cancel();
    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, CloudError::Cancelled));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn cancellation_during_execute_aborts_the_wait() {
    let transport = Arc::new(HangingTransport {
        entered: tokio::sync::Notify::new(),
    });
    let invoker = archive_invoker(transport.clone());

    let handle = invoker.spawn("ListArchives", vec![]);
    transport.entered.notified().await;
    handle.cancel();
    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, CloudError::Cancelled));
}

#[tokio::test]
async fn cancelling_one_invocation_leaves_others_untouched() {
    let transport = Arc::new(StubTransport::default());
    transport.push(200, br#"{"response": {"archives": []}}"#);
    let invoker = archive_invoker(transport);

    let doomed = invoker.spawn("ListArchives", vec![]);
    let healthy = invoker.spawn("ListArchives", vec![]);
    doomed.cancel();

    assert!(matches!(
        doomed.join().await.unwrap_err(),
        CloudError::Cancelled
    ));
    let out = healthy.join().await.unwrap();
    assert_eq!(out.into_json().unwrap().as_array().map(Vec::len), Some(0));
}

#[test]
fn standard_filters_cover_auth_signing_and_virtual_host() {
    let credentials = Arc::new(StaticCredentials::new("AKID", "s3cr3t"));
    let config = ProviderConfig::new("p", "https://api.example.com");
    let invoker = Invoker::builder(config, Arc::new(StubTransport::default()))
        .standard_filters(credentials)
        .operation(
            OperationDescriptor::builder("Ping", Method::POST, "/")
                .form_constant("Action", "Ping")
                .filter("form-signer")
                .filter("virtual-host")
                .build(),
        )
        .unwrap()
        .build()
        .unwrap();

    let request = invoker.prepare("Ping", &[]).unwrap();
    assert_eq!(request.applied_filters(), ["form-signer", "virtual-host"]);
    assert_eq!(request.header("host"), Some("api.example.com"));
    assert!(request.header("authorization").unwrap().starts_with("Signer "));
}

#[tokio::test]
async fn unknown_operations_carry_provider_context() {
    let invoker = archive_invoker(Arc::new(StubTransport::default()));
    let err = invoker.invoke("NoSuchOp", &[]).await.unwrap_err();
    assert!(!err.is_retryable());
    match err {
        CloudError::UnknownOperation {
            provider,
            operation,
        } => {
            assert_eq!(provider, "glacier-like");
            assert_eq!(operation, "NoSuchOp");
        }
        other => panic!("expected UnknownOperation, got {other:?}"),
    }
}
