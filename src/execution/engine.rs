//! Execution Engine Trait - contract for running SQL against the warehouse
//!
//! Engines report every failure as an error whose message is meant to be
//! read by the generator on the next attempt. They never retry a failed
//! query themselves.

use crate::error::Result;
use crate::execution::result::QueryResult;
use async_trait::async_trait;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Engine name (e.g., "bigquery")
    fn name(&self) -> &'static str;

    /// Execute one SQL statement
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    /// Check if the engine is reachable
    async fn health_check(&self) -> Result<bool>;
}
