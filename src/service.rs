//! Query service: question validation in front of the retry loop.
//!
//! Holds the process-wide read-only schema and the injected collaborators.
//! Shared by the HTTP server and the interactive CLI.

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::execution::bigquery_engine::BigQueryEngine;
use crate::execution::engine::QueryExecutor;
use crate::execution_loop::{Resolution, RetryController};
use crate::llm::{LlmClient, LlmSqlGenerator, SqlGenerator};
use crate::schema::Schema;
use std::sync::Arc;
use tracing::{info, warn};

pub const NO_QUERY_PROVIDED: &str = "No query provided";

pub struct QueryService {
    schema: Arc<Schema>,
    controller: RetryController,
    max_attempts: u32,
}

impl QueryService {
    pub fn new(
        schema: Arc<Schema>,
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<dyn QueryExecutor>,
        max_attempts: u32,
    ) -> Self {
        Self {
            schema,
            controller: RetryController::new(generator, executor),
            max_attempts,
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let schema = Arc::new(Schema::load(&config.schema_path)?);
        let llm = LlmClient::from_config(&config.llm)?;
        let generator: Arc<dyn SqlGenerator> = Arc::new(LlmSqlGenerator::new(llm));
        let executor: Arc<dyn QueryExecutor> = Arc::new(BigQueryEngine::from_config(&config.bigquery)?);

        info!(
            "Query service ready (model: {}, max attempts: {})",
            config.llm.model, config.max_attempts
        );
        Ok(Self::new(schema, generator, executor, config.max_attempts))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn engine_name(&self) -> &'static str {
        self.controller.executor_name()
    }

    /// Whether the warehouse answers a trivial query.
    pub async fn warehouse_healthy(&self) -> bool {
        match self.controller.executor_healthy().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Warehouse health check failed: {}", e);
                false
            }
        }
    }

    /// Answer a question with the configured attempt budget.
    pub async fn answer(&self, question: Option<&str>) -> Result<Resolution> {
        self.answer_with_budget(question, self.max_attempts).await
    }

    pub async fn answer_with_budget(&self, question: Option<&str>, max_attempts: u32) -> Result<Resolution> {
        let question = validate_question(question)?;
        self.controller.resolve(question, &self.schema, max_attempts).await
    }
}

/// Reject a missing or blank question before any backend is called.
pub fn validate_question(question: Option<&str>) -> Result<&str> {
    match question.map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(BridgeError::Validation(NO_QUERY_PROVIDED.to_string())),
    }
}
