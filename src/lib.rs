pub mod agent_prompts;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod llm;
pub mod observability;
pub mod schema;
pub mod service;
pub mod sql_text;

pub use config::Config;
pub use error::{BridgeError, Result};
pub use execution::{QueryExecutor, QueryResult};
pub use execution_loop::{Resolution, RetryController};
pub use llm::SqlGenerator;
pub use schema::Schema;
pub use service::QueryService;
