//! CLI-specific error types
//!
//! Every CLI error terminates the process with a non-zero exit code.

use std::fmt;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Target table is not managed by the engine
    TableNotManaged,
    /// Column name does not match the accepted syntax
    InvalidColumnName,
    /// Engine-reported error
    EngineError,
    /// I/O error
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "EAV_CLI_CONFIG_ERROR",
            Self::TableNotManaged => "EAV_CLI_TABLE_NOT_MANAGED",
            Self::InvalidColumnName => "EAV_CLI_INVALID_COLUMN_NAME",
            Self::EngineError => "EAV_CLI_ENGINE_ERROR",
            Self::IoError => "EAV_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// Table not managed by the engine
    pub fn table_not_managed(table: &str) -> Self {
        Self::new(
            CliErrorCode::TableNotManaged,
            format!("Table '{}' is not managed by the EAV engine", table),
        )
    }

    /// Invalid column name
    pub fn invalid_column_name(name: &str) -> Self {
        Self::new(
            CliErrorCode::InvalidColumnName,
            format!("Invalid column name '{}'", name),
        )
    }

    /// Engine-reported error
    pub fn engine(err: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::EngineError, err.to_string())
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Returns the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
