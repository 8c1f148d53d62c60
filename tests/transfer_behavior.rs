//! End-to-end transfer behavior against a local mock server.
//!
//! `load_request` blocks its calling thread, so each test drives it from
//! `spawn_blocking` while wiremock serves responses on the async side.

use std::sync::Once;
use std::time::Duration;

use curl_transfer::{
    Body, ErrorDomain, Method, Request, ResponseHead, TransferError, TransferHandle,
    TransferObserver,
};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Installs the test-wide tracing subscriber; `RUST_LOG` controls verbosity.
fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Records every observer event in arrival order.
#[derive(Debug, Default)]
struct RecordingObserver {
    data: Vec<u8>,
    events: Vec<Event>,
}

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Response(u16),
    Data(usize),
    Upload(usize),
}

impl TransferObserver for RecordingObserver {
    fn on_data(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
        self.events.push(Event::Data(data.len()));
    }

    fn on_response(&mut self, response: &ResponseHead) {
        self.events.push(Event::Response(response.status()));
    }

    fn on_upload_chunk(&mut self, len: usize) {
        self.events.push(Event::Upload(len));
    }
}

impl RecordingObserver {
    fn last_status(&self) -> Option<u16> {
        self.events.iter().rev().find_map(|event| match event {
            Event::Response(status) => Some(*status),
            _ => None,
        })
    }
}

async fn run_request(request: Request) -> (Result<(), TransferError>, RecordingObserver) {
    run_request_with(TransferHandle::new(), request).await
}

async fn run_request_with(
    mut handle: TransferHandle,
    request: Request,
) -> (Result<(), TransferError>, RecordingObserver) {
    init_logging();
    tokio::task::spawn_blocking(move || {
        let mut observer = RecordingObserver::default();
        let result = handle.load_request(request, &mut observer);
        (result, observer)
    })
    .await
    .expect("transfer task panicked")
}

#[tokio::test]
async fn test_get_delivers_response_then_body_then_success() {
    let server = MockServer::start().await;
    let body = b"hello from the mock server".to_vec();
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let (result, observer) = run_request(Request::get(format!("{}/file", server.uri()))).await;

    assert!(result.is_ok(), "expected success, got {result:?}");
    assert_eq!(observer.data, body, "body chunks must concatenate to the resource");

    let first_response = observer
        .events
        .iter()
        .position(|e| matches!(e, Event::Response(_)))
        .expect("no response metadata delivered");
    let first_data = observer
        .events
        .iter()
        .position(|e| matches!(e, Event::Data(_)))
        .expect("no body data delivered");
    assert!(
        first_response < first_data,
        "response metadata must precede body data: {:?}",
        observer.events
    );
}

#[tokio::test]
async fn test_head_request_suppresses_body() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (result, observer) =
        run_request(Request::new(Method::Head, format!("{}/file", server.uri()))).await;

    assert!(result.is_ok(), "expected success, got {result:?}");
    assert_eq!(observer.last_status(), Some(200));
    assert!(observer.data.is_empty(), "HEAD must not deliver body data");
}

#[tokio::test]
async fn test_http_error_status_is_context_not_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_bytes(b"gone".to_vec()))
        .mount(&server)
        .await;

    let (result, observer) = run_request(Request::get(format!("{}/missing", server.uri()))).await;

    assert!(
        result.is_ok(),
        "protocol status alone must not fail the transfer: {result:?}"
    );
    assert_eq!(observer.last_status(), Some(404));
    assert_eq!(observer.data, b"gone");
}

#[tokio::test]
async fn test_unknown_host_maps_to_engine_domain_with_failing_url() {
    let url = "http://curl-transfer-test.invalid/resource";
    let (result, observer) = run_request(Request::get(url)).await;

    let err = result.expect_err("transfer to a non-existent host must fail");
    assert_eq!(err.domain(), Some(ErrorDomain::Easy));
    assert!(matches!(err.code(), Some(code) if code != 0));
    assert_eq!(err.url(), Some(url), "failing URL context must match the request");
    assert!(observer.data.is_empty());
}

#[tokio::test]
async fn test_cancel_before_start_aborts_at_first_checkpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let handle = TransferHandle::new();
    handle.cancel();
    let (result, observer) =
        run_request_with(handle, Request::get(format!("{}/file", server.uri()))).await;

    let err = result.expect_err("pre-cancelled transfer must not succeed");
    assert!(err.is_cancelled(), "expected cancellation, got {err:?}");
    assert!(observer.data.is_empty(), "no data may be delivered after cancellation");
}

#[tokio::test]
async fn test_cancel_mid_transfer_stops_at_next_callback_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0_u8; 1 << 20])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    init_logging();
    let mut handle = TransferHandle::new();
    let token = handle.cancel_token();
    let url = format!("{}/slow", server.uri());
    let worker = tokio::task::spawn_blocking(move || {
        let mut observer = RecordingObserver::default();
        let result = handle.load_request(Request::get(url), &mut observer);
        (result, observer)
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();

    let (result, observer) = worker.await.expect("transfer task panicked");
    let err = result.expect_err("cancelled transfer must not succeed");
    assert!(err.is_cancelled(), "expected cancellation, got {err:?}");
    assert!(
        observer.data.is_empty(),
        "no body data may arrive after the flag is observed"
    );
}

#[tokio::test]
async fn test_put_streams_body_and_reports_upload_progress() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/up"))
        .and(body_string("hello world"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let mut request = Request::new(Method::Put, format!("{}/up", server.uri()));
    request.set_body(Body::bytes(b"hello world".to_vec()));
    let (result, observer) = run_request(request).await;

    assert!(result.is_ok(), "expected success, got {result:?}");
    assert_eq!(observer.last_status(), Some(201));

    let uploads: Vec<usize> = observer
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Upload(len) => Some(*len),
            _ => None,
        })
        .collect();
    assert_eq!(uploads.last(), Some(&0), "final zero-length notice must close the upload");
    let total: usize = uploads.iter().sum();
    assert_eq!(total, "hello world".len(), "chunk notices must cover the body");
}

#[tokio::test]
async fn test_handle_is_reusable_after_completion_and_cancel_is_inert() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    init_logging();
    let url = format!("{}/file", server.uri());
    let (first, second, third) = tokio::task::spawn_blocking(move || {
        let mut handle = TransferHandle::new();
        let token = handle.cancel_token();

        let first =
            handle.load_request(Request::get(url.clone()), &mut RecordingObserver::default());

        // Repeated cancellation after completion never rewrites a result
        // that was already returned.
        token.cancel();
        token.cancel();

        let second =
            handle.load_request(Request::get(url.clone()), &mut RecordingObserver::default());
        let third = handle.load_request(Request::get(url), &mut RecordingObserver::default());
        (first, second, third)
    })
    .await
    .expect("transfer task panicked");

    assert!(first.is_ok(), "first transfer failed: {first:?}");
    let err = second.expect_err("pending cancellation applies to the next transfer");
    assert!(err.is_cancelled());
    assert!(third.is_ok(), "handle must be clean again after the cancellation was consumed: {third:?}");
}

#[test]
fn test_engine_version_is_reported() {
    let version = curl_transfer::version();
    assert!(!version.is_empty());
    assert!(version.contains('.'), "unexpected version string: {version}");
}
