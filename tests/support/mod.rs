#![allow(dead_code)]

pub mod fake_server;

use async_trait::async_trait;
use querybridge::execution::Row;
use querybridge::{BridgeError, QueryExecutor, QueryResult, QueryService, Result, Schema, SqlGenerator};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One recorded generator invocation
#[derive(Debug, Clone)]
pub struct GeneratorCall {
    pub question: String,
    pub error: Option<String>,
    /// Address of the schema reference that was passed in
    pub schema_addr: usize,
}

/// Generator that replays scripted outcomes, then keeps returning `fallback`.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl ScriptedGenerator {
    pub fn always(sql: &str) -> Self {
        Self::scripted(Vec::new(), sql)
    }

    pub fn scripted(script: Vec<std::result::Result<&str, &str>>, fallback: &str) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlGenerator for ScriptedGenerator {
    async fn generate(&self, schema: &Schema, question: &str, error: Option<&str>) -> Result<String> {
        self.calls.lock().unwrap().push(GeneratorCall {
            question: question.to_string(),
            error: error.map(str::to_string),
            schema_addr: schema as *const Schema as usize,
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(sql)) => Ok(sql),
            Some(Err(message)) => Err(BridgeError::Llm(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Executor that replays scripted outcomes, then keeps returning `fallback`.
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<std::result::Result<QueryResult, String>>>,
    fallback: std::result::Result<QueryResult, String>,
    calls: Mutex<Vec<String>>,
    healthy: bool,
}

impl ScriptedExecutor {
    pub fn succeeding(result: QueryResult) -> Self {
        Self::scripted(Vec::new(), Ok(result))
    }

    pub fn failing(message: &str) -> Self {
        Self::scripted(Vec::new(), Err(message.to_string()))
    }

    pub fn scripted(
        script: Vec<std::result::Result<QueryResult, String>>,
        fallback: std::result::Result<QueryResult, String>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Fail with each message in turn, then succeed with `result`.
    pub fn failing_then(messages: &[&str], result: QueryResult) -> Self {
        let script = messages.iter().map(|m| Err(m.to_string())).collect();
        Self::scripted(script, Ok(result))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.calls.lock().unwrap().push(sql.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or_else(|| self.fallback.clone()) {
            Ok(result) => Ok(result),
            Err(message) => Err(BridgeError::Execution(message)),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }
}

pub fn retail_schema() -> Schema {
    Schema::new(json!({
        "dataset": "retail",
        "tables": {
            "sales": {
                "columns": {
                    "brand_name": "STRING",
                    "amount": "FLOAT64",
                    "sold_at": "TIMESTAMP"
                }
            }
        }
    }))
}

pub fn sales_result(total: f64) -> QueryResult {
    let mut row = Row::new();
    row.insert("brand_name".to_string(), json!("House of RARE RABBIT"));
    row.insert("total_sales".to_string(), json!(total));
    QueryResult::new(
        vec!["brand_name".to_string(), "total_sales".to_string()],
        vec![row],
        "scripted",
        7,
    )
}

pub fn service(
    generator: Arc<ScriptedGenerator>,
    executor: Arc<ScriptedExecutor>,
    max_attempts: u32,
) -> QueryService {
    QueryService::new(Arc::new(retail_schema()), generator, executor, max_attempts)
}
