//! Execution Module - running generated SQL against the warehouse
//!
//! - QueryExecutor trait for pluggable engines
//! - QueryResult as the tabular result format
//! - BigQuery engine and its service-account authentication

pub mod engine;
pub mod result;

pub mod bigquery_engine;
pub mod gcp_auth;

pub use bigquery_engine::BigQueryEngine;
pub use engine::QueryExecutor;
pub use result::{QueryResult, Row};
