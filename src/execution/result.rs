//! Query Result - tabular result returned by an execution engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One result row: column name -> value
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result order
    pub columns: Vec<String>,

    pub rows: Vec<Row>,

    pub row_count: usize,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Engine that executed the query
    pub engine_name: String,

    /// Engine-specific metadata (job id, bytes processed, ...)
    pub engine_metadata: HashMap<String, Value>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>, engine_name: impl Into<String>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
            engine_name: engine_name.into(),
            engine_metadata: HashMap::new(),
        }
    }

    /// Rows as a JSON array of objects.
    pub fn records(&self) -> Value {
        Value::Array(self.rows.iter().cloned().map(Value::Object).collect())
    }

    pub fn into_records(self) -> Vec<Row> {
        self.rows
    }
}
