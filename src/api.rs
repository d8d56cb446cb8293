//! REST API Server
//!
//! `POST /query` answers one natural-language question; `GET /health`
//! reports readiness.

use crate::error::BridgeError;
use crate::execution::result::Row;
use crate::service::QueryService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// API State - Shared between handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<QueryService>,
}

impl ApiState {
    pub fn new(service: QueryService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub result: Vec<Row>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub schema_loaded: bool,
    pub warehouse_reachable: bool,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            BridgeError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing query: {}", other),
            ),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Readiness: 503 when the warehouse cannot run `SELECT 1`.
async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = state.service.warehouse_healthy().await;
    let (code, status) = if reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    let body = HealthResponse {
        status: status.to_string(),
        engine: state.service.engine_name().to_string(),
        schema_loaded: !state.service.schema().document().is_null(),
        warehouse_reachable: reachable,
    };
    (code, Json(body))
}

/// Answer a question. A missing or unparsable body counts as no question.
async fn handle_query(
    State(state): State<ApiState>,
    payload: Option<Json<QueryRequest>>,
) -> Result<Json<QueryResponse>, BridgeError> {
    let question = payload.and_then(|Json(request)| request.query);
    let span = tracing::info_span!("query", request_id = %Uuid::new_v4());

    async move {
        info!("Received query: {:?}", question);
        match state.service.answer(question.as_deref()).await {
            Ok(resolution) => {
                info!(
                    "Answered in {} attempt(s) with {} rows",
                    resolution.attempts, resolution.result.row_count
                );
                Ok(Json(QueryResponse {
                    result: resolution.result.into_records(),
                }))
            }
            Err(e) => {
                error!("Query failed: {}", e);
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(handle_query))
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: SocketAddr, state: ApiState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Query API listening on http://{}", addr);
    axum::serve(listener, app).await
}
