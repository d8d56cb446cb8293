//! Extraction of SQL from a model response
//!
//! Models frequently wrap the statement in a Markdown code fence even when
//! told not to. The rule applied here:
//!
//! 1. If the response contains a fenced block (three backticks, optionally
//!    followed by a language tag such as `sql`), the body of the first block
//!    is used.
//! 2. Otherwise the whole response is used.
//! 3. Surrounding whitespace and trailing semicolons are removed.
//!
//! An empty result is an error so the retry loop treats it like any other
//! failed attempt.

use crate::error::{BridgeError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:[A-Za-z0-9_-]+[ \t]*\r?\n|[ \t]*\r?\n)?(.*?)```")
            .expect("fence pattern is valid")
    })
}

pub fn extract_sql(response: &str) -> Result<String> {
    let trimmed = response.trim();

    let body = match fence_regex().captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        // An opening fence without a closing one.
        None if trimmed.starts_with("```") => strip_language_line(trimmed.trim_start_matches('`')),
        None => trimmed,
    };

    let sql = body.trim().trim_end_matches(';').trim_end();
    if sql.is_empty() {
        return Err(BridgeError::Llm("Generated SQL is empty".to_string()));
    }
    Ok(sql.to_string())
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn strip_language_line(text: &str) -> &str {
    match text.split_once('\n') {
        Some((first, rest)) if is_language_tag(first) => rest,
        _ => text,
    }
}
