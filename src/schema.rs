//! Warehouse schema description
//!
//! An opaque JSON document describing tables and columns. It is loaded once
//! and shared read-only across requests; the generator receives it verbatim.

use crate::error::{BridgeError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    document: Value,
}

impl Schema {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// Load the schema file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Schema(format!("Failed to read schema file {}: {}", path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            BridgeError::Schema(format!("Schema file {} is not valid JSON: {}", path.display(), e))
        })?;
        info!("Loaded schema description from {}", path.display());
        Ok(Self { document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Text form used inside the generation prompt.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| self.document.to_string())
    }
}
