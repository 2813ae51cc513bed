//! Common error types used throughout discforge.
//!
//! External tool failures, parse failures, cache/database problems and
//! environment problems all funnel into [`Error`]. The scan orchestrator uses
//! [`Error::is_environment`] to decide whether a failure aborts the whole
//! invocation or only the current file.

use std::path::PathBuf;
use std::time::Duration;

/// Common error type for discforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not installed or not on `PATH`.
    #[error("required tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool ran but reported failure.
    #[error("tool error [{tool}]: {message}")]
    Tool { tool: String, message: String },

    /// An external tool exceeded its hard timeout.
    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    /// Probing produced no usable result.
    #[error("probe error: {0}")]
    Probe(String),

    /// Structured output from a tool or cache could not be parsed.
    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    /// The disc image is missing, even after waiting for the remote listing.
    #[error("image still not visible after re-listing: {}", .0.display())]
    NotVisible(PathBuf),

    /// The host environment cannot support a scan (disk space, mounts, ...).
    #[error("environment error: {0}")]
    Environment(String),

    /// A database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(tool: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            after,
        }
    }

    /// Create a parse error.
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Environment error.
    pub fn environment<S: Into<String>>(msg: S) -> Self {
        Self::Environment(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors that make the whole scan invocation pointless, not just one file.
    pub fn is_environment(&self) -> bool {
        matches!(self, Error::ToolNotFound { .. } | Error::Environment(_))
    }

    /// Errors worth an immediate in-process retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Tool { .. } | Error::Timeout { .. } | Error::Probe(_) | Error::NotVisible(_)
        )
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
