//! Error types for the fan-out library.

use thiserror::Error;

/// Main error type for fan-out operations.
///
/// Per-table problems during a run (introspection, provisioning, extraction,
/// load) are normally recorded on the job outcome instead of being returned;
/// these variants exist so the engine can describe them uniformly.
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A plan or the source referenced an endpoint that is not configured
    #[error("Unknown endpoint: '{0}'")]
    UnknownEndpoint(String),

    /// Source metadata could not be read
    #[error("Introspection failed for table {table}: {message}")]
    Introspection { table: String, message: String },

    /// Target DDL failed
    #[error("Provisioning failed for table {table}: {message}")]
    Provisioning { table: String, message: String },

    /// A page fetch from the source failed
    #[error("Extraction failed for table {table}: {message}")]
    Extraction { table: String, message: String },

    /// A statement returned a non-zero status
    #[error("Execution failed on {target}: {message}")]
    Execution { target: String, message: String },

    /// IO error (file operations, process spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FanoutError {
    /// Create an Introspection error
    pub fn introspection(table: impl Into<String>, message: impl Into<String>) -> Self {
        FanoutError::Introspection {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Provisioning error
    pub fn provisioning(table: impl Into<String>, message: impl Into<String>) -> Self {
        FanoutError::Provisioning {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Extraction error
    pub fn extraction(table: impl Into<String>, message: impl Into<String>) -> Self {
        FanoutError::Extraction {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Execution error
    pub fn execution(target: impl Into<String>, message: impl Into<String>) -> Self {
        FanoutError::Execution {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            FanoutError::Config(_) | FanoutError::UnknownEndpoint(_) | FanoutError::Yaml(_) => 2,
            FanoutError::Io(_) => 3,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for fan-out operations.
pub type Result<T> = std::result::Result<T, FanoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_format_table() {
        let err = FanoutError::extraction("Sales.Store", "timeout");
        assert_eq!(
            err.to_string(),
            "Extraction failed for table Sales.Store: timeout"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(FanoutError::Config("x".into()).exit_code(), 2);
        assert_eq!(FanoutError::UnknownEndpoint("pg".into()).exit_code(), 2);
        assert_eq!(FanoutError::execution("pg", "boom").exit_code(), 1);
    }

    #[test]
    fn test_format_detailed_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = FanoutError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: missing"));
    }
}
