//! Process configuration
//!
//! Everything is read from the environment once at startup. Binaries call
//! `dotenv::dotenv()` first so a local `.env` file is honoured.

use crate::error::{BridgeError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BIGQUERY_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:80";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub credentials_path: PathBuf,
    pub project_id: String,
    pub location: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub bigquery: BigQueryConfig,
    pub schema_path: PathBuf,
    pub max_attempts: u32,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| BridgeError::Config(format!("{} is not set", key)))
        };

        let llm = LlmConfig {
            api_key: required("OPENAI_API_KEY")?,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        };

        let bigquery = BigQueryConfig {
            credentials_path: PathBuf::from(required("GOOGLE_APPLICATION_CREDENTIALS")?),
            project_id: required("BIGQUERY_PROJECT_ID")?,
            location: get("BIGQUERY_LOCATION"),
            timeout_ms: parse_or("BIGQUERY_TIMEOUT_MS", get("BIGQUERY_TIMEOUT_MS"), DEFAULT_BIGQUERY_TIMEOUT_MS)?,
        };

        let max_attempts = parse_or("MAX_ATTEMPTS", get("MAX_ATTEMPTS"), DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(BridgeError::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| BridgeError::Config(format!("BIND_ADDR '{}' is invalid: {}", bind_addr, e)))?;

        Ok(Self {
            llm,
            bigquery,
            schema_path: PathBuf::from(required("SCHEMA_FILE_PATH")?),
            max_attempts,
            bind_addr,
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| BridgeError::Config(format!("{} '{}' is invalid: {}", key, raw, e))),
        None => Ok(default),
    }
}
