//! Router tests against an in-process mock SAS
//!
//! A local HTTP server captures every request path and body, so the tests
//! can assert which SAS method a batch was posted to, and that rejected
//! batches never reach the wire at all.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use dp_server::metrics::PipelineMetrics;
use dp_server::router::{
    EndpointValidator, RequestMapping, Router, RouterError, TlsOptions,
};
use sas_proto::revocation::RevocationError;
use sas_proto::RequestTypeName;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Captured = Arc<Mutex<Vec<(String, Value)>>>;

#[derive(Clone)]
struct MockState {
    captured: Captured,
    reply: Arc<Value>,
}

async fn capture_handler(State(state): State<MockState>, uri: Uri, body: String) -> Json<Value> {
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    state
        .captured
        .lock()
        .unwrap()
        .push((uri.path().to_string(), parsed));
    Json((*state.reply).clone())
}

async fn spawn_mock(reply: Value) -> (SocketAddr, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        captured: captured.clone(),
        reply: Arc::new(reply),
    };

    let app = axum::Router::new()
        .fallback(capture_handler)
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, captured)
}

fn test_router(sas_url: &str, rc_url: &str) -> Router {
    Router::new(
        sas_url,
        rc_url,
        RequestMapping::standard(),
        TlsOptions {
            verify: true,
            ..TlsOptions::default()
        },
        Duration::from_secs(5),
        Arc::new(PipelineMetrics::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_every_mapped_type_hits_its_method_url() {
    let (addr, captured) = spawn_mock(json!({})).await;
    let base = format!("http://{}", addr);
    let router = test_router(&base, &format!("{}/rc", base));

    let mapping = RequestMapping::standard();
    for rt in RequestTypeName::ALL {
        let batch = json!({ rt.request_key(): [{"cbsdId": "device-1"}] });
        router.post_to_sas(&batch).await.unwrap();

        let calls = captured.lock().unwrap();
        let (path, body) = calls.last().unwrap().clone();
        assert_eq!(
            path,
            format!("/{}", mapping.method_for(rt.request_key()).unwrap())
        );
        // The full grouped dict goes out as the POST body, unmodified.
        assert_eq!(body, batch);
    }

    assert_eq!(captured.lock().unwrap().len(), RequestTypeName::ALL.len());
}

#[tokio::test]
async fn test_unmapped_type_performs_no_http_call() {
    let (addr, captured) = spawn_mock(json!({})).await;
    let router = test_router(&format!("http://{}", addr), &format!("http://{}/rc", addr));

    let result = router.post_to_sas(&json!({"unknownType": [{}]})).await;
    assert!(matches!(result, Err(RouterError::UnmappedRequestType(_))));
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_dict_performs_no_http_call() {
    let (addr, captured) = spawn_mock(json!({})).await;
    let router = test_router(&format!("http://{}", addr), &format!("http://{}/rc", addr));

    let result = router.post_to_sas(&json!({})).await;
    assert!(matches!(result, Err(RouterError::EmptyRequests)));
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transport_failure_wraps_into_router_error() {
    // Nothing listens on port 1.
    let router = test_router("http://127.0.0.1:1", "http://127.0.0.1:1/rc");

    let result = router
        .post_to_sas(&json!({"heartbeatRequest": [{}]}))
        .await;
    assert!(matches!(result, Err(RouterError::Transport(_))));
}

#[tokio::test]
async fn test_response_is_returned_uninterpreted() {
    let reply = json!({
        "grantResponse": [
            {"grantId": "g-1", "response": {"responseCode": 0}},
            {"response": {"responseCode": 401}}
        ]
    });
    let (addr, _captured) = spawn_mock(reply.clone()).await;
    let router = test_router(&format!("http://{}", addr), &format!("http://{}/rc", addr));

    let response = router
        .post_to_sas(&json!({"grantRequest": [{}, {}]}))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, reply);
}

#[tokio::test]
async fn test_redirect_posts_body_to_radio_controller() {
    let (addr, captured) = spawn_mock(json!({"ok": true})).await;
    let router = test_router(
        "http://127.0.0.1:1", // SAS unused here
        &format!("http://{}/sas/ingest", addr),
    );

    let body = json!({"registrationResponse": [{"response": {"responseCode": 0}}]});
    router
        .redirect_sas_response_to_radio_controller(&body)
        .await
        .unwrap();

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "/sas/ingest");
    assert_eq!(calls[0].1, body);
}

/// Validator stub that always reports the certificate revoked
struct AlwaysRevoked;

impl EndpointValidator for AlwaysRevoked {
    fn validate<'a>(
        &'a self,
        _host: &'a str,
        _port: u16,
    ) -> Pin<Box<dyn Future<Output = Result<(), RevocationError>> + Send + 'a>> {
        Box::pin(async {
            Err(RevocationError::CertificateRevoked {
                serial: "0badc0de".to_string(),
                revoked_at: chrono::Utc::now(),
            })
        })
    }
}

#[tokio::test]
async fn test_revoked_certificate_aborts_before_post() {
    let (addr, captured) = spawn_mock(json!({})).await;
    let router = test_router(&format!("http://{}", addr), &format!("http://{}/rc", addr))
        .with_validator(Arc::new(AlwaysRevoked));

    let result = router
        .post_to_sas(&json!({"registrationRequest": [{}]}))
        .await;

    match result {
        Err(RouterError::Revocation(RevocationError::CertificateRevoked { serial, .. })) => {
            assert_eq!(serial, "0badc0de");
        }
        other => panic!("expected revocation error, got {:?}", other.map(|_| ())),
    }
    // The POST never happened.
    assert!(captured.lock().unwrap().is_empty());
}
