//! Pipeline tests for Client against a capturing transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use pretty_assertions::assert_eq;
use reqcall_core::{
    ApiDescriptor, ApiResponse, Client, ContentType, Context, DescriptorRegistry, ErrorKind,
    Header, HttpSend, Input, Method, RecordTrace, Result, SignConfig, SignerRegistry,
    TraceOutcome, TraceRecord,
};
use serde_json::{json, Value};

#[derive(Debug)]
struct Sent {
    req: http::Request<Bytes>,
    timeout: Option<Duration>,
}

/// Mock transport that records every request and answers with a fixed response.
#[derive(Debug, Clone)]
struct MockHttpSend {
    status: StatusCode,
    body: &'static str,
    delay: Option<Duration>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl MockHttpSend {
    fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: None,
            sent: Arc::default(),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>> {
        self.sent.lock().unwrap().push(Sent { req, timeout });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(http::Response::builder()
            .status(self.status)
            .body(Bytes::from_static(self.body.as_bytes()))?)
    }
}

#[derive(Debug, Default, Clone)]
struct CollectTrace(Arc<Mutex<Vec<TraceRecord>>>);

impl RecordTrace for CollectTrace {
    fn record(&self, record: &TraceRecord) {
        self.0.lock().unwrap().push(record.clone());
    }
}

const OK_BODY: &str = r#"{"ret":"0","msg":"ok","payload":{"id":7}}"#;

fn input(v: Value) -> Input {
    v.as_object().cloned().unwrap()
}

fn api() -> ApiDescriptor {
    ApiDescriptor::new("http://api.example.com", "/v1/item").with_extraction(
        "0", "ret", "msg", "payload",
    )
}

fn client(http: MockHttpSend) -> (Client, Arc<DescriptorRegistry>, Arc<SignerRegistry>) {
    let apis = Arc::new(DescriptorRegistry::new());
    let signers = Arc::new(SignerRegistry::new());
    let client = Client::new(Context::new().with_http_send(http))
        .with_descriptors(apis.clone())
        .with_signers(signers.clone());
    (client, apis, signers)
}

fn query_of(req: &http::Request<Bytes>) -> HashMap<String, String> {
    form_urlencoded::parse(req.uri().query().unwrap_or_default().as_bytes())
        .into_owned()
        .collect()
}

#[tokio::test]
async fn test_get_shapes_query_parameters() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, _) = client(http.clone());

    let resp = client
        .execute(&api(), input(json!({"a": 1, "b": "x"})), Header::new())
        .await
        .unwrap();
    assert_eq!(resp.data(), Some(&json!({"id": 7})));

    let sent = http.sent.lock().unwrap();
    let req = &sent[0].req;
    assert_eq!(req.method(), http::Method::GET);
    assert_eq!(req.uri().path(), "/v1/item");
    assert_eq!(
        query_of(req),
        HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "x".to_string())
        ])
    );
    assert!(req.body().is_empty());
}

#[tokio::test]
async fn test_post_json_keeps_types() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, _) = client(http.clone());
    let api = api()
        .with_method(Method::Post)
        .with_content_type(ContentType::Json);

    client
        .execute(&api, input(json!({"a": 1, "b": "x"})), Header::new())
        .await
        .unwrap();

    let sent = http.sent.lock().unwrap();
    let body: Value = serde_json::from_slice(sent[0].req.body()).unwrap();
    assert_eq!(body, json!({"a": 1, "b": "x"}));
    assert!(body["a"].is_number());
}

#[tokio::test]
async fn test_post_form_uses_multipart() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, _) = client(http.clone());
    let api = api().with_method(Method::Post);

    client
        .execute(&api, input(json!({"a": 1})), Header::new())
        .await
        .unwrap();

    let sent = http.sent.lock().unwrap();
    let content_type = sent[0].req.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = std::str::from_utf8(sent[0].req.body()).unwrap();
    assert!(body.contains("name=\"a\"\r\n\r\n1\r\n"));
}

#[tokio::test]
async fn test_signer_header_overrides_static_header() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, signers) = client(http.clone());
    signers.register_native("stamp", |input, mut header, _| {
        header.insert("k".to_string(), "signed".to_string());
        Ok((input, header))
    });
    let api = api()
        .with_static_header("k", "static")
        .with_static_header("x-static", "kept")
        .with_signer("stamp", SignConfig::new());

    client
        .execute(&api, Input::new(), Header::new())
        .await
        .unwrap();

    let sent = http.sent.lock().unwrap();
    let headers = sent[0].req.headers();
    assert_eq!(headers.get_all("k").iter().count(), 1);
    assert_eq!(headers["k"], "signed");
    assert_eq!(headers["x-static"], "kept");
}

#[tokio::test]
async fn test_signer_receives_config_and_rewrites_input() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, signers) = client(http.clone());
    signers.register_native("app", |mut input, header, config| {
        input.insert("app_id".to_string(), config["app_id"].clone());
        Ok((input, header))
    });
    let api = api().with_signer("app", input(json!({"app_id": "demo"})));

    client
        .execute(&api, input(json!({"q": "rust"})), Header::new())
        .await
        .unwrap();

    let sent = http.sent.lock().unwrap();
    let query = query_of(&sent[0].req);
    assert_eq!(query["app_id"], "demo");
    assert_eq!(query["q"], "rust");
}

#[tokio::test]
async fn test_signer_error_short_circuits() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, signers) = client(http.clone());
    signers.register_native("strict", |_, _, config| {
        config
            .get("secret")
            .ok_or_else(|| anyhow::anyhow!("missing secret"))?;
        unreachable!("config has no secret")
    });
    let api = api().with_signer("strict", SignConfig::new());

    let err = client
        .execute(&api, Input::new(), Header::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignerExecution);
    assert!(err.to_string().contains("strict"));
    assert!(err.to_string().contains("missing secret"));
    assert_eq!(http.count(), 0);
}

#[tokio::test]
async fn test_signer_not_found() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, _) = client(http.clone());
    let api = api().with_signer("ghost", SignConfig::new());

    let err = client
        .execute(&api, Input::new(), Header::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignerNotFound);
    assert_eq!(err.to_string(), "signer `ghost` not supported");
    assert_eq!(http.count(), 0);
}

#[tokio::test]
async fn test_execute_by_name() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, apis, _) = client(http.clone());
    apis.register("item", api());

    let resp = client
        .execute_by_name("item", Input::new(), Header::new())
        .await
        .unwrap();
    assert_eq!(
        resp,
        ApiResponse::Extracted {
            code: "0".to_string(),
            message: "ok".to_string(),
            data: Some(json!({"id": 7})),
            error: false,
        }
    );

    let err = client
        .execute_by_name("missing", Input::new(), Header::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DescriptorNotFound);
    assert_eq!(err.to_string(), "api config `missing` not found");
}

#[tokio::test]
async fn test_business_failure_is_not_an_error() {
    let http = MockHttpSend::new(StatusCode::OK, r#"{"ret":"1001","msg":"denied"}"#);
    let (client, _, _) = client(http);

    let resp = client
        .execute(&api(), Input::new(), Header::new())
        .await
        .unwrap();
    assert!(resp.is_error());
    assert_eq!(resp.code(), "1001");
    assert_eq!(resp.message(), "denied");
    assert_eq!(resp.data(), None);
}

#[tokio::test]
async fn test_non_success_status_skips_extraction() {
    let http = MockHttpSend::new(StatusCode::SERVICE_UNAVAILABLE, OK_BODY);
    let (client, _, _) = client(http);

    let err = client
        .execute(&api(), Input::new(), Header::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonSuccessStatus);
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn test_send_returns_raw_response() {
    let http = MockHttpSend::new(StatusCode::NOT_FOUND, "gone");
    let (client, _, _) = client(http);

    let resp = client
        .send(&api(), Input::new(), Header::new())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.body().as_ref(), b"gone");
}

#[tokio::test]
async fn test_timeout_is_passed_to_transport() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let (client, _, _) = client(http.clone());

    client
        .execute(&api().with_timeout_ms(250), Input::new(), Header::new())
        .await
        .unwrap();
    client
        .execute(&api().with_timeout_ms(0), Input::new(), Header::new())
        .await
        .unwrap();

    let sent = http.sent.lock().unwrap();
    assert_eq!(sent[0].timeout, Some(Duration::from_millis(250)));
    assert_eq!(sent[1].timeout, None);
}

#[tokio::test]
async fn test_disabled_extraction_returns_raw_body() {
    let http = MockHttpSend::new(StatusCode::OK, "plain text");
    let (client, _, _) = client(http);

    let resp = client
        .execute(
            &api().with_extract_disabled(true),
            Input::new(),
            Header::new(),
        )
        .await
        .unwrap();
    assert!(!resp.is_error());
    assert_eq!(resp.data(), Some(&json!("plain text")));
}

#[tokio::test]
async fn test_execute_with_cancel() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY).with_delay(Duration::from_secs(30));
    let trace = CollectTrace::default();
    let client = Client::new(
        Context::new()
            .with_http_send(http.clone())
            .with_trace(trace.clone()),
    )
    .with_signers(Arc::new(SignerRegistry::new()));

    let err = client
        .execute_with_cancel(
            &api(),
            Input::new(),
            Header::new(),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let records = trace.0.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, TraceOutcome::Cancelled);
}

#[tokio::test]
async fn test_trace_records_every_exit_path() {
    let http = MockHttpSend::new(StatusCode::OK, OK_BODY);
    let trace = CollectTrace::default();
    let signers = Arc::new(SignerRegistry::new());
    signers.register_native("fail", |_, _, _| Err(anyhow::anyhow!("boom")));
    signers.register_native("stamp", |input, mut header, _| {
        header.insert("x-sign".to_string(), "abc".to_string());
        Ok((input, header))
    });
    let client = Client::new(
        Context::new()
            .with_http_send(http)
            .with_trace(trace.clone()),
    )
    .with_signers(signers);

    client
        .execute(
            &api().with_signer("stamp", SignConfig::new()),
            input(json!({"a": 1})),
            Header::new(),
        )
        .await
        .unwrap();
    client
        .execute(
            &api().with_signer("fail", SignConfig::new()),
            Input::new(),
            Header::new(),
        )
        .await
        .unwrap_err();

    let records = trace.0.lock().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].header["x-sign"], "abc");
    assert_eq!(records[0].input["a"], json!(1));
    assert_eq!(
        records[0].outcome,
        TraceOutcome::Success {
            status: 200,
            body: OK_BODY.to_string()
        }
    );

    match &records[1].outcome {
        TraceOutcome::Failure { error } => assert!(error.contains("boom")),
        other => panic!("unexpected outcome {other:?}"),
    }
}
