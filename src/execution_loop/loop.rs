//! Execution Loop
//!
//! Bounded generate/execute retry loop. Every failure, whether it comes
//! from generation or from execution, is captured as text and handed to the
//! next generation attempt. There is no backoff and no distinction between
//! error kinds; the attempt budget is the only bound.

use crate::error::{BridgeError, Result};
use crate::execution::engine::QueryExecutor;
use crate::execution::result::QueryResult;
use crate::llm::SqlGenerator;
use crate::schema::Schema;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Successful outcome of a request
#[derive(Debug, Clone)]
pub struct Resolution {
    pub sql: String,
    pub result: QueryResult,
    /// Attempts consumed, including the successful one
    pub attempts: u32,
}

/// Per-request state: the question, the last failure and the number of
/// failed attempts so far.
#[derive(Debug)]
struct AttemptState<'a> {
    question: &'a str,
    error: Option<String>,
    attempt: u32,
}

impl<'a> AttemptState<'a> {
    fn new(question: &'a str) -> Self {
        Self {
            question,
            error: None,
            attempt: 0,
        }
    }

    fn record_failure(&mut self, message: String) {
        self.attempt += 1;
        self.error = Some(message);
    }
}

pub struct RetryController {
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn QueryExecutor>,
}

impl RetryController {
    pub fn new(generator: Arc<dyn SqlGenerator>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { generator, executor }
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    pub async fn executor_healthy(&self) -> Result<bool> {
        self.executor.health_check().await
    }

    /// Generate and execute SQL for `question`, feeding each failure back to
    /// the generator, for at most `max_attempts` cycles.
    pub async fn resolve(&self, question: &str, schema: &Schema, max_attempts: u32) -> Result<Resolution> {
        if max_attempts == 0 {
            return Err(BridgeError::Config("Attempt budget must be at least 1".to_string()));
        }

        let mut state = AttemptState::new(question);

        while state.attempt < max_attempts {
            let current = state.attempt + 1;
            info!("Execution attempt {} of {}", current, max_attempts);

            match self.run_attempt(schema, &state).await {
                Ok((sql, result)) => {
                    info!("Execution succeeded on attempt {} ({} rows)", current, result.row_count);
                    return Ok(Resolution {
                        sql,
                        result,
                        attempts: current,
                    });
                }
                Err(e) => {
                    let message = e.feedback_message();
                    warn!("Attempt {} of {} failed: {}", current, max_attempts, message);
                    state.record_failure(message);
                }
            }
        }

        Err(BridgeError::Resolution {
            attempts: max_attempts,
            last_error: state.error.unwrap_or_default(),
        })
    }

    async fn run_attempt(&self, schema: &Schema, state: &AttemptState<'_>) -> Result<(String, QueryResult)> {
        let sql = self
            .generator
            .generate(schema, state.question, state.error.as_deref())
            .await?;
        debug!("Candidate SQL: {}", sql);
        let result = self.executor.execute(&sql).await?;
        Ok((sql, result))
    }
}
