mod support;

use querybridge::execution::BigQueryEngine;
use querybridge::{BridgeError, QueryExecutor};
use serde_json::{json, Value};
use support::fake_server::FakeServer;

const PROJECT: &str = "retail-analytics";
const SQL: &str = "SELECT SUM(amount) AS total_sales, brand_name FROM retail.sales GROUP BY brand_name";

fn engine(server: &FakeServer, timeout_ms: u64) -> BigQueryEngine {
    BigQueryEngine::with_access_token(
        PROJECT.to_string(),
        Some("asia-south1".to_string()),
        timeout_ms,
        "test-token",
    )
    .unwrap()
    .with_base_url(&server.base_url)
}

fn job_reference() -> Value {
    json!({"projectId": PROJECT, "jobId": "job_7", "location": "asia-south1"})
}

fn sales_schema() -> Value {
    json!({"fields": [
        {"name": "total_sales", "type": "FLOAT", "mode": "NULLABLE"},
        {"name": "brand_name", "type": "STRING", "mode": "NULLABLE"}
    ]})
}

fn running() -> (u16, Value) {
    (200, json!({"jobComplete": false, "jobReference": job_reference()}))
}

fn execution_message(err: BridgeError) -> String {
    match err {
        BridgeError::Execution(message) => message,
        other => panic!("expected execution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_polls_until_complete_and_reads_every_page() {
    let server = FakeServer::start(vec![
        running(),
        (200, json!({
            "jobComplete": true,
            "jobReference": job_reference(),
            "schema": sales_schema(),
            "rows": [{"f": [{"v": "1200.5"}, {"v": "House of RARE RABBIT"}]}],
            "pageToken": "p2",
            "totalBytesProcessed": "1024"
        })),
        (200, json!({
            "jobComplete": true,
            "jobReference": job_reference(),
            "schema": sales_schema(),
            "rows": [{"f": [{"v": "300"}, {"v": "Rare Rabbit Kids"}]}]
        })),
    ])
    .await;

    let result = engine(&server, 5_000).execute(SQL).await.unwrap();

    assert_eq!(result.columns, vec!["total_sales".to_string(), "brand_name".to_string()]);
    assert_eq!(result.row_count, 2);
    // Keys keep the SELECT order.
    assert_eq!(
        serde_json::to_string(&result.rows[0]).unwrap(),
        r#"{"total_sales":1200.5,"brand_name":"House of RARE RABBIT"}"#
    );
    assert_eq!(result.rows[1]["total_sales"], json!(300.0));
    assert_eq!(result.engine_metadata["job_id"], json!("job_7"));
    assert_eq!(result.engine_metadata["total_bytes_processed"], json!("1024"));

    let requests = server.requests();
    assert_eq!(requests.len(), 3);

    let submit = &requests[0];
    assert_eq!(submit.method, "POST");
    assert_eq!(submit.path, "/projects/retail-analytics/queries");
    assert_eq!(submit.authorization.as_deref(), Some("Bearer test-token"));
    let body = submit.json();
    assert_eq!(body["query"], SQL);
    assert_eq!(body["useLegacySql"], false);
    assert_eq!(body["location"], "asia-south1");

    let poll = &requests[1];
    assert_eq!(poll.method, "GET");
    assert_eq!(poll.path, "/projects/retail-analytics/queries/job_7");
    assert!(poll.query_has("location=asia-south1"));
    assert!(!poll.query.as_deref().unwrap_or_default().contains("pageToken"));

    assert!(requests[2].query_has("pageToken=p2"));
}

#[tokio::test]
async fn test_http_error_carries_bigquery_message() {
    let server = FakeServer::start(vec![(
        400,
        json!({"error": {
            "code": 400,
            "message": "Unrecognized name: rarerabbit at [1:8]",
            "status": "INVALID_ARGUMENT"
        }}),
    )])
    .await;

    let err = engine(&server, 5_000).execute(SQL).await.unwrap_err();

    assert_eq!(err.feedback_message(), "Unrecognized name: rarerabbit at [1:8]");
    assert_eq!(execution_message(err), "Unrecognized name: rarerabbit at [1:8]");
}

#[tokio::test]
async fn test_job_errors_without_schema_fail() {
    let server = FakeServer::start(vec![(
        200,
        json!({
            "jobComplete": true,
            "jobReference": job_reference(),
            "errors": [{"message": "Access Denied: Table retail.sales", "reason": "accessDenied"}]
        }),
    )])
    .await;

    let err = engine(&server, 5_000).execute(SQL).await.unwrap_err();

    assert_eq!(execution_message(err), "Access Denied: Table retail.sales (accessDenied)");
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_rows_without_schema_are_rejected() {
    let server = FakeServer::start(vec![(
        200,
        json!({
            "jobComplete": true,
            "jobReference": job_reference(),
            "rows": [{"f": [{"v": "1200.5"}, {"v": "House of RARE RABBIT"}]}]
        }),
    )])
    .await;

    let err = engine(&server, 5_000).execute(SQL).await.unwrap_err();

    assert!(execution_message(err).contains("without a result schema"));
}

#[tokio::test]
async fn test_running_job_times_out() {
    let server = FakeServer::start(vec![running()]).await;

    let err = engine(&server, 50).execute(SQL).await.unwrap_err();

    assert_eq!(execution_message(err), "BigQuery query timeout after 50ms");
}

#[tokio::test]
async fn test_poll_count_is_bounded() {
    let server = FakeServer::start(vec![running()]).await;

    let err = engine(&server, 60_000)
        .with_max_polls(2)
        .execute(SQL)
        .await
        .unwrap_err();

    assert_eq!(execution_message(err), "BigQuery query exceeded max polls (2)");
    // One submission plus two result fetches.
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_health_check_runs_trivial_query() {
    let healthy = FakeServer::start(vec![(
        200,
        json!({
            "jobComplete": true,
            "jobReference": job_reference(),
            "schema": {"fields": [{"name": "f0_", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "1"}]}]
        }),
    )])
    .await;
    assert!(engine(&healthy, 5_000).health_check().await.unwrap());
    assert_eq!(healthy.requests()[0].json()["query"], "SELECT 1");

    let denied = FakeServer::start(vec![(
        403,
        json!({"error": {"code": 403, "message": "Access Denied: Project retail-analytics"}}),
    )])
    .await;
    assert!(!engine(&denied, 5_000).health_check().await.unwrap());
}
