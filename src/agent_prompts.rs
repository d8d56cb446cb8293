//! Agent Prompts - prompts for natural-language to SQL generation
//!
//! The system prompt fixes the output contract (a single SQL statement, no
//! commentary) and asks for tolerant matching of proper nouns. The user
//! prompt carries the schema, the question and the previous error, if any.

use crate::schema::Schema;

/// System prompt for the SQL generator
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that translates natural language questions into BigQuery Standard SQL queries using the database schema supplied by the user.

## Output

Return exactly one SQL statement. Do not output anything other than the SQL query: no explanation, no comments, no surrounding text.

## Names of clients and brands

Users often type names of clients, brands and other free-text values partially, misspelled or in a different case. You must still find them.
For example, the stored value may be "House of RARE RABBIT" while the user writes "rare rabbit", "rare rabit" or "house of rare".

- Never compare such values with `=`.
- Use `LIKE` with `%` wildcards on a case-normalised column, e.g. `LOWER(brand_name) LIKE '%rare%rabbit%'`.
- Split multi-word names into fragments so missing or reordered words still match.

## Errors

If the user message contains an error from a previous attempt, the previous query failed with that error. Write a corrected query that avoids it."#;

/// Text used in the "Any Error" section when there is no previous failure.
pub const NO_PREVIOUS_ERROR: &str = "None";

/// Build the user message for one generation attempt.
pub fn build_sql_generation_prompt(schema: &Schema, question: &str, error: Option<&str>) -> String {
    format!(
        "Database Schema:\n{}\n\nUser Query:\n{}\n\nAny Error:\n{}\n\nSQL Query:\n",
        schema.render(),
        question.trim(),
        error.unwrap_or(NO_PREVIOUS_ERROR),
    )
}
