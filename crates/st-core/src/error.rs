//! Error types for st-core

use thiserror::Error;

/// Core error type for sqltrace
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Table lookup against an id the graph has never seen
    #[error("[E001] table not found: {id}")]
    TableNotFound { id: String },

    /// E002: Circular dependency detected in the table-edge graph
    #[error("[E002] circular dependency detected: {}", .tables.join(" -> "))]
    CircularDependency { tables: Vec<String> },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
