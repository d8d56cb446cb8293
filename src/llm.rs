//! LLM client and the SQL generator built on top of it.

use crate::agent_prompts::{build_sql_generation_prompt, SQL_GENERATION_SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::{BridgeError, Result};
use crate::schema::Schema;
use crate::sql_text::extract_sql;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Turns a question into candidate SQL.
///
/// `error` is the failure message of the previous attempt, `None` on the
/// first attempt of a request.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, schema: &Schema, question: &str, error: Option<&str>) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(config.api_key.clone(), config.model.clone(), config.base_url.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user exchange and return the assistant's text.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BridgeError::Llm(format!("LLM API error ({}): {}", status, error_text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BridgeError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        parse_chat_content(&response_json)
    }
}

/// Pull the assistant message out of a chat-completions response body.
pub(crate) fn parse_chat_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(BridgeError::Llm(format!("LLM API error: {}", error)));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| BridgeError::Llm("No choices in LLM response".to_string()))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("content_filter") => {
            return Err(BridgeError::Llm("LLM response was filtered by content policy".to_string()));
        }
        Some("length") => warn!("LLM response was truncated due to length limit"),
        _ => {}
    }

    let content = choice["message"]["content"].as_str().unwrap_or_default();
    if content.trim().is_empty() {
        return Err(BridgeError::Llm("Empty content in LLM response".to_string()));
    }
    Ok(content.to_string())
}

/// SQL generator backed by a chat-completions model.
pub struct LlmSqlGenerator {
    llm: LlmClient,
}

impl LlmSqlGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate(&self, schema: &Schema, question: &str, error: Option<&str>) -> Result<String> {
        let prompt = build_sql_generation_prompt(schema, question, error);
        let response = self.llm.chat(SQL_GENERATION_SYSTEM_PROMPT, &prompt).await?;
        let sql = extract_sql(&response)?;
        debug!(model = self.llm.model(), sql = %sql, "Generated SQL");
        Ok(sql)
    }
}
