//! Wiremock stand-ins for the Trading 212 endpoints

use super::TEST_AUTH_HEADER;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the export endpoints
pub const EXPORTS: &str = "/equity/history/exports";

/// Path of the cash endpoint
pub const CASH: &str = "/equity/account/cash";

/// Path the mock serves report artifacts from
pub const ARTIFACT: &str = "/files/report.csv";

/// Sample report with two data rows
pub const SAMPLE_CSV: &str = "Action,Time,ISIN,Ticker,No. of shares,Total\n\
Market buy,2026-01-05 14:30:00,US0378331005,AAPL,1.5,345.10\n\
Dividend (Dividend),2026-01-09 09:00:00,US5949181045,MSFT,0,0.83\n";

/// Absolute download link for the artifact on `server`
pub fn artifact_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), ARTIFACT)
}

/// Accept one export submission and answer with `report_id`
pub async fn mount_submit(server: &MockServer, report_id: i64) {
    Mock::given(method("POST"))
        .and(path(EXPORTS))
        .and(header("Authorization", TEST_AUTH_HEADER))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reportId": report_id })),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Answer the next `times` job-list queries with `status` for `report_id`
pub async fn mount_list_status(server: &MockServer, report_id: i64, status: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(EXPORTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "reportId": report_id, "status": status }
        ])))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Answer job-list queries with `report_id` finished and linked to the artifact
pub async fn mount_list_finished(server: &MockServer, report_id: i64) {
    Mock::given(method("GET"))
        .and(path(EXPORTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "reportId": report_id - 1, "status": "Finished", "downloadLink": "https://elsewhere/old.csv" },
            { "reportId": report_id, "status": "Finished", "downloadLink": artifact_url(server) }
        ])))
        .mount(server)
        .await;
}

/// Serve `body` as the report artifact
pub async fn mount_artifact(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(ARTIFACT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/csv")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Number of requests `server` saw for `method_name` on `endpoint`
pub async fn count_requests(server: &MockServer, method_name: &str, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path() == endpoint)
        .count()
}
