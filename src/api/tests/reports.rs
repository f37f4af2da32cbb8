use super::*;
use crate::api::routes::{self, ReportListResponse, ReportResponse};
use axum::extract::State;
use axum::response::IntoResponse;

const CSV: &str = "Action,Time,Total\nMarket buy,2026-01-02 10:00:00,150.00\n";

#[tokio::test]
async fn test_create_report_saves_file() {
    let temp_dir = tempdir().unwrap();
    let transport = ScriptedTransport::new(job_list(77, "Finished", Some("https://x/77.csv")))
        .then(Ok(serde_json::json!({ "reportId": 77 })))
        .then(job_list(77, "Processing", None))
        .with_artifact(Ok(CSV.as_bytes().to_vec()));
    let app = test_router(test_config(temp_dir.path()), transport);

    let response = send(app, "POST", "/reports").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ReportResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert!(body.saved);
    let file = body.file.unwrap();
    assert_eq!(file.name, "History Report 77.csv");
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("History Report 77.csv")).unwrap(),
        CSV
    );
}

#[tokio::test]
async fn test_create_report_empty() {
    let temp_dir = tempdir().unwrap();
    let transport = ScriptedTransport::new(job_list(5, "Finished", Some("https://x/5.csv")))
        .then(Ok(serde_json::json!({ "reportId": 5 })))
        .with_artifact(Ok(b"Action,Time,Total\n".to_vec()));
    let app = test_router(test_config(temp_dir.path()), transport);

    let response = send(app, "POST", "/reports").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ReportResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert!(!body.saved);
    assert!(body.file.is_none());
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_create_report_without_report_id() {
    let temp_dir = tempdir().unwrap();
    let transport = ScriptedTransport::new(Ok(serde_json::json!({ "status": "accepted" })));
    let app = test_router(test_config(temp_dir.path()), transport);

    let response = send(app, "POST", "/reports").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(api_error(response).await.error.code, "no_report_id");
}

#[tokio::test]
async fn test_create_report_times_out() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.poll.max_attempts = 3;
    let transport = ScriptedTransport::new(Ok(serde_json::json!([])))
        .then(Ok(serde_json::json!({ "reportId": 8 })));
    let app = test_router(config, transport);

    let response = send(app, "POST", "/reports").await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    let error = api_error(response).await;
    assert_eq!(error.error.code, "export_timed_out");
    assert_eq!(error.error.details.unwrap()["attempts"], 3);
}

#[tokio::test]
async fn test_create_report_rate_limited_throughout() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.poll.max_attempts = 3;
    config.poll.rate_limit_backoff.max_delay = Duration::from_millis(5);
    let transport = ScriptedTransport::new(Err(TransportError::RateLimited { retry_after: None }))
        .then(Ok(serde_json::json!({ "reportId": 8 })));
    let app = test_router(config, transport);

    let response = send(app, "POST", "/reports").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(api_error(response).await.error.code, "export_rate_limited");
}

#[tokio::test]
async fn test_request_deadline_cancels_export() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.export.settle_delay = Duration::from_secs(30);
    config.server.request_timeout = Duration::from_millis(50);
    let transport = ScriptedTransport::new(Ok(serde_json::json!({ "reportId": 8 })));
    let app = test_router(config, transport);

    let response = tokio::time::timeout(Duration::from_secs(5), send(app, "POST", "/reports"))
        .await
        .expect("deadline should end the request");
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(api_error(response).await.error.code, "cancelled");
}

#[tokio::test]
async fn test_concurrent_export_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let client = Trading212Client::with_transport(
        config.clone(),
        Arc::new(ScriptedTransport::new(Ok(serde_json::json!({ "reportId": 1 })))),
    );
    let state = AppState::new(client, Arc::new(config));

    let _running = state.try_begin_export().unwrap();

    let response = routes::create_report(State(state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(api_error(response).await.error.code, "export_in_progress");

    let response = routes::sync(State(state.clone())).await.into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_export_slot_is_released() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let client = Trading212Client::with_transport(
        config.clone(),
        Arc::new(ScriptedTransport::new(Ok(serde_json::Value::Null))),
    );
    let state = AppState::new(client, Arc::new(config));

    drop(state.try_begin_export().unwrap());
    assert!(state.try_begin_export().is_ok());
}

#[tokio::test]
async fn test_list_reports_newest_first() {
    let temp_dir = tempdir().unwrap();
    std::fs::write(temp_dir.path().join("History Report 1.csv"), CSV).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    std::fs::write(temp_dir.path().join("History Report 2.csv"), CSV).unwrap();
    std::fs::write(temp_dir.path().join("portfolio.json"), "{}").unwrap();

    let app = test_router(
        test_config(temp_dir.path()),
        ScriptedTransport::new(Ok(serde_json::Value::Null)),
    );

    let response = send(app, "GET", "/reports").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ReportListResponse = serde_json::from_value(json_body(response).await).unwrap();
    let names: Vec<&str> = body.reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["History Report 2.csv", "History Report 1.csv"]);
}

#[tokio::test]
async fn test_list_reports_missing_dir_is_empty() {
    let temp_dir = tempdir().unwrap();
    let app = test_router(
        test_config(&temp_dir.path().join("not-created-yet")),
        ScriptedTransport::new(Ok(serde_json::Value::Null)),
    );

    let response = send(app, "GET", "/reports").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reports"], serde_json::json!([]));
}
