use super::*;
use crate::error::{ApiError, TransportError};
use crate::export::test_helpers::{ScriptedTransport, job_list};
use crate::transport::Transport;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

mod reports;

/// Config with short waits so export flows finish quickly in real time
fn test_config(report_dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.report_dir = report_dir.to_path_buf();
    config.export.settle_delay = Duration::ZERO;
    config.poll.interval = Duration::from_millis(1);
    config.poll.rate_limit_backoff.initial_delay = Duration::from_millis(1);
    config.poll.rate_limit_backoff.jitter = false;
    config
}

/// Router over a scripted transport
fn test_router(config: Config, transport: ScriptedTransport) -> Router {
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let client = Trading212Client::with_transport(config.clone(), transport);
    create_router(client, Arc::new(config))
}

async fn send(app: Router, method: &str, uri: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn api_error(response: axum::response::Response) -> ApiError {
    serde_json::from_value(json_body(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_starts_and_stops() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port

    let client = Trading212Client::with_transport(
        config.clone(),
        Arc::new(ScriptedTransport::new(Ok(serde_json::Value::Null))),
    );
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(start_api_server(
        client,
        Arc::new(config),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let temp_dir = tempdir().unwrap();
    let app = test_router(
        test_config(temp_dir.path()),
        ScriptedTransport::new(Ok(serde_json::Value::Null)),
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.server.cors_enabled = false;
    let app = test_router(config, ScriptedTransport::new(Ok(serde_json::Value::Null)));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_get_cash() {
    let temp_dir = tempdir().unwrap();
    let app = test_router(
        test_config(temp_dir.path()),
        ScriptedTransport::new(Ok(serde_json::json!({ "free": 250.75, "total": 1000 }))),
    );

    let response = send(app, "GET", "/account/cash").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["free"], 250.75);
    assert_eq!(body["total"], 1000);
}

#[tokio::test]
async fn test_get_cash_upstream_rejection_is_bad_gateway() {
    let temp_dir = tempdir().unwrap();
    let app = test_router(
        test_config(temp_dir.path()),
        ScriptedTransport::new(Err(TransportError::RequestFailed {
            status: 401,
            body: "bad key".into(),
        })),
    );

    let response = send(app, "GET", "/account/cash").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let error = api_error(response).await;
    assert_eq!(error.error.code, "upstream_request_failed");
    assert_eq!(error.error.details.unwrap()["upstream_status"], 401);
}

#[tokio::test]
async fn test_get_cash_rate_limited() {
    let temp_dir = tempdir().unwrap();
    let app = test_router(
        test_config(temp_dir.path()),
        ScriptedTransport::new(Err(TransportError::RateLimited { retry_after: Some(9) })),
    );

    let response = send(app, "GET", "/account/cash").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "9");
}

#[tokio::test]
async fn test_sync_returns_cash_and_report() {
    let temp_dir = tempdir().unwrap();
    let transport = ScriptedTransport::new(job_list(12, "Finished", Some("https://x/12.csv")))
        .then(Ok(serde_json::json!({ "free": 5 })))
        .then(Ok(serde_json::json!({ "reportId": 12 })))
        .with_artifact(Ok(b"Action,Total\nDeposit,5\n".to_vec()));
    let app = test_router(test_config(temp_dir.path()), transport);

    let response = send(app, "POST", "/sync").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["cash"]["free"], 5);
    assert!(
        body["report"]
            .as_str()
            .unwrap()
            .ends_with("History Report 12.csv")
    );
}
