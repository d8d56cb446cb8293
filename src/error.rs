use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed after {attempts} attempts. Last error: {last_error}")]
    Resolution { attempts: u32, last_error: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BridgeError {
    /// Message fed back to the generator on the next attempt.
    ///
    /// Collaborator failures carry the raw backend text, so the variant
    /// prefix is dropped for them.
    pub fn feedback_message(&self) -> String {
        match self {
            BridgeError::Llm(msg) | BridgeError::Execution(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_message_names_budget_and_last_error() {
        let err = BridgeError::Resolution {
            attempts: 5,
            last_error: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed after 5 attempts. Last error: permission denied"
        );
    }

    #[test]
    fn feedback_message_keeps_raw_backend_text() {
        let err = BridgeError::Execution("unknown column: rarerabbit".to_string());
        assert_eq!(err.feedback_message(), "unknown column: rarerabbit");

        let err = BridgeError::Auth("token expired".to_string());
        assert_eq!(err.feedback_message(), "Authentication error: token expired");
    }
}
