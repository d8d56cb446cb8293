//! BigQuery Execution Engine
//!
//! Runs Standard SQL through the BigQuery REST API (`jobs.query`), polls
//! `jobs.getQueryResults` until the job completes and every page has been
//! read, and decodes the `{"f": [{"v": ...}]}` row format into JSON rows.

use crate::config::BigQueryConfig;
use crate::error::{BridgeError, Result};
use crate::execution::engine::QueryExecutor;
use crate::execution::gcp_auth::{ServiceAccountKey, ServiceAccountTokenProvider, TokenSource, BIGQUERY_SCOPE};
use crate::execution::result::{QueryResult, Row};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const MAX_POLLS: usize = 10_000;

pub struct BigQueryEngine {
    project_id: String,
    location: Option<String>,
    timeout_ms: u64,
    max_polls: usize,
    base_url: String,
    client: Client,
    auth: TokenSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<TableSchema>,
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
    #[serde(default = "default_job_complete")]
    job_complete: bool,
    #[serde(default)]
    errors: Vec<ErrorProto>,
    total_bytes_processed: Option<String>,
}

fn default_job_complete() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

impl FieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref().map(|m| m.eq_ignore_ascii_case("REPEATED")).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    message: String,
    reason: Option<String>,
}

impl BigQueryEngine {
    pub fn new(
        project_id: String,
        location: Option<String>,
        timeout_ms: u64,
        key: ServiceAccountKey,
    ) -> Result<Self> {
        let client = http_client(timeout_ms)?;
        let auth = TokenSource::ServiceAccount(ServiceAccountTokenProvider::new(
            key,
            BIGQUERY_SCOPE,
            client.clone(),
        ));
        Ok(Self::from_parts(project_id, location, timeout_ms, client, auth))
    }

    /// Engine that sends a pre-issued access token instead of signing in
    /// with a service account.
    pub fn with_access_token(
        project_id: String,
        location: Option<String>,
        timeout_ms: u64,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = http_client(timeout_ms)?;
        let auth = TokenSource::Static(token.into());
        Ok(Self::from_parts(project_id, location, timeout_ms, client, auth))
    }

    fn from_parts(
        project_id: String,
        location: Option<String>,
        timeout_ms: u64,
        client: Client,
        auth: TokenSource,
    ) -> Self {
        Self {
            project_id,
            location,
            timeout_ms,
            max_polls: MAX_POLLS,
            base_url: BIGQUERY_API_BASE.to_string(),
            client,
            auth,
        }
    }

    pub fn from_config(config: &BigQueryConfig) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let engine = Self::new(
            config.project_id.clone(),
            config.location.clone(),
            config.timeout_ms,
            key,
        )?;
        info!(
            "BigQuery engine ready for project {} as {}",
            engine.project_id,
            engine.auth.principal()
        );
        Ok(engine)
    }

    /// Override the API root (e.g. for a local emulator)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cap the number of `getQueryResults` calls per query
    pub fn with_max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = max_polls;
        self
    }

    async fn submit_query(&self, sql: &str) -> Result<QueryResponse> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);
        let mut body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": self.timeout_ms,
        });
        if let Some(location) = &self.location {
            body["location"] = Value::String(location.clone());
        }

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Execution(format!("Failed to submit BigQuery query: {}", e)))?;

        read_query_response(response).await
    }

    async fn fetch_results(&self, job: &JobReference, page_token: Option<&str>) -> Result<QueryResponse> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, self.project_id, job.job_id
        );
        let mut params: Vec<(&str, String)> = vec![("timeoutMs", self.timeout_ms.to_string())];
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| BridgeError::Execution(format!("Failed to fetch BigQuery results: {}", e)))?;

        read_query_response(response).await
    }
}

fn http_client(timeout_ms: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_millis(timeout_ms) + Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .tcp_keepalive(Duration::from_secs(60))
        .build()?)
}

async fn read_query_response(response: reqwest::Response) -> Result<QueryResponse> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BridgeError::Execution(api_error_message(status.as_u16(), &text)));
    }

    response
        .json()
        .await
        .map_err(|e| BridgeError::Execution(format!("Failed to parse BigQuery response: {}", e)))
}

/// BigQuery's own error text, so the generator sees e.g.
/// `Unrecognized name: rarerabbit at [1:8]`.
fn api_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("BigQuery request failed with status {}: {}", status, body))
}

fn job_errors_message(errors: &[ErrorProto]) -> String {
    errors
        .iter()
        .map(|e| match &e.reason {
            Some(reason) => format!("{} ({})", e.message, reason),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn decode_row(fields: &[FieldSchema], row: &TableRow) -> Row {
    let mut out = Map::new();
    for (field, cell) in fields.iter().zip(row.f.iter()) {
        out.insert(field.name.clone(), decode_value(field, &cell.v));
    }
    out
}

fn decode_value(field: &FieldSchema, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    if field.is_repeated() {
        return match value.as_array() {
            Some(items) => Value::Array(
                items
                    .iter()
                    .map(|item| decode_scalar(field, item.get("v").unwrap_or(&Value::Null)))
                    .collect(),
            ),
            None => value.clone(),
        };
    }
    decode_scalar(field, value)
}

fn decode_scalar(field: &FieldSchema, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    let text = value.as_str();
    match field.field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => text
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| value.clone()),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => text
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        "BOOLEAN" | "BOOL" => match text {
            Some(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Some(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => value.clone(),
        },
        "RECORD" | "STRUCT" => {
            let cells = value.get("f").and_then(|f| f.as_array());
            match cells {
                Some(cells) => {
                    let mut nested = Map::new();
                    for (sub_field, cell) in field.fields.iter().zip(cells.iter()) {
                        let inner = cell.get("v").unwrap_or(&Value::Null);
                        nested.insert(sub_field.name.clone(), decode_value(sub_field, inner));
                    }
                    Value::Object(nested)
                }
                None => value.clone(),
            }
        }
        _ => value.clone(),
    }
}

#[async_trait]
impl QueryExecutor for BigQueryEngine {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let start_time = Instant::now();
        debug!("Executing query with BigQuery: {}", sql);

        let mut response = self.submit_query(sql).await?;
        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| BridgeError::Execution("BigQuery response has no job reference".to_string()))?;
        info!("BigQuery job submitted: {}", job.job_id);

        let mut schema: Option<TableSchema> = None;
        let mut rows: Vec<Row> = Vec::new();
        let mut bytes_processed: Option<String> = None;
        let mut poll_count = 0;

        loop {
            let mut page_token = None;

            if response.job_complete {
                if schema.is_none() {
                    schema = response.schema.take();
                }
                if bytes_processed.is_none() {
                    bytes_processed = response.total_bytes_processed.take();
                }
                if !response.errors.is_empty() {
                    let message = job_errors_message(&response.errors);
                    if schema.is_none() {
                        return Err(BridgeError::Execution(message));
                    }
                    warn!("BigQuery job {} reported: {}", job.job_id, message);
                }
                if schema.is_none() && !response.rows.is_empty() {
                    return Err(BridgeError::Execution(
                        "BigQuery returned rows without a result schema".to_string(),
                    ));
                }

                let fields = schema.as_ref().map(|s| s.fields.as_slice()).unwrap_or(&[]);
                rows.extend(response.rows.iter().map(|row| decode_row(fields, row)));

                match response.page_token.take() {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }

            if start_time.elapsed().as_millis() as u64 > self.timeout_ms {
                return Err(BridgeError::Execution(format!(
                    "BigQuery query timeout after {}ms",
                    self.timeout_ms
                )));
            }

            poll_count += 1;
            if poll_count > self.max_polls {
                return Err(BridgeError::Execution(format!(
                    "BigQuery query exceeded max polls ({})",
                    self.max_polls
                )));
            }

            if page_token.is_none() {
                // Still running: back off briefly before asking again.
                let delay_ms = 100 * poll_count.min(10) as u64;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            response = self.fetch_results(&job, page_token.as_deref()).await?;
        }

        let columns: Vec<String> = schema
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let execution_time = start_time.elapsed().as_millis() as u64;

        let mut result = QueryResult::new(columns, rows, self.name(), execution_time);
        result
            .engine_metadata
            .insert("job_id".to_string(), Value::String(job.job_id.clone()));
        if let Some(location) = job.location {
            result.engine_metadata.insert("location".to_string(), Value::String(location));
        }
        if let Some(bytes) = bytes_processed {
            result
                .engine_metadata
                .insert("total_bytes_processed".to_string(), Value::String(bytes));
        }

        info!(
            "BigQuery job {} returned {} rows in {}ms",
            job.job_id, result.row_count, execution_time
        );
        Ok(result)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.execute("SELECT 1").await {
            Ok(_) => Ok(true),
            Err(e) => {
                error!("BigQuery health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
