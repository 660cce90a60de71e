//! Registry error types
//!
//! Error codes:
//! - EAV_NATIVE_COLLISION (configuration)
//! - EAV_UNKNOWN_TYPE (configuration)
//! - EAV_DUPLICATE_DEFINITION (configuration)
//! - EAV_INVALID_NAME (configuration)
//! - EAV_MISSING_PRIMARY_KEY (configuration)
//! - EAV_MALFORMED_DEFINITION (storage corruption)
//! - EAV_STORAGE (propagated backend failure)

use std::fmt;

/// Registry-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorCode {
    /// Virtual column name collides with a native physical column
    NativeCollision,
    /// Type alias could not be mapped to a canonical type
    UnknownType,
    /// Definition already exists and overwrite was not requested
    DuplicateDefinition,
    /// Column name does not match the accepted syntax
    InvalidName,
    /// Record is missing its primary-key properties
    MissingPrimaryKey,
    /// A stored definition row could not be decoded
    MalformedDefinition,
    /// Underlying backend failure
    Storage,
}

impl RegistryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            RegistryErrorCode::NativeCollision => "EAV_NATIVE_COLLISION",
            RegistryErrorCode::UnknownType => "EAV_UNKNOWN_TYPE",
            RegistryErrorCode::DuplicateDefinition => "EAV_DUPLICATE_DEFINITION",
            RegistryErrorCode::InvalidName => "EAV_INVALID_NAME",
            RegistryErrorCode::MissingPrimaryKey => "EAV_MISSING_PRIMARY_KEY",
            RegistryErrorCode::MalformedDefinition => "EAV_MALFORMED_DEFINITION",
            RegistryErrorCode::Storage => "EAV_STORAGE",
        }
    }
}

impl fmt::Display for RegistryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One collected validation failure from a metadata mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Code classifying the failure
    pub code: RegistryErrorCode,
    /// Human-readable description
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: RegistryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Promotes the issue to a hard error (fail-fast reporting mode)
    pub fn into_error(self) -> RegistryError {
        RegistryError {
            code: self.code,
            message: self.message,
            source: None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Registry error with code and context
#[derive(Debug)]
pub struct RegistryError {
    code: RegistryErrorCode,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RegistryError {
    /// Create a native-collision error
    pub fn native_collision(table: &str, name: &str) -> Self {
        Self {
            code: RegistryErrorCode::NativeCollision,
            message: format!("Column '{}' is a native column of table '{}'", name, table),
            source: None,
        }
    }

    /// Create an unknown-type error
    pub fn unknown_type(raw: &str) -> Self {
        Self {
            code: RegistryErrorCode::UnknownType,
            message: format!("Unknown attribute type '{}'", raw),
            source: None,
        }
    }

    /// Create a duplicate-definition error
    pub fn duplicate(table: &str, name: &str, bundle: Option<&str>) -> Self {
        let scope = match bundle {
            Some(b) => format!("bundle '{}'", b),
            None => "all bundles".to_string(),
        };
        Self {
            code: RegistryErrorCode::DuplicateDefinition,
            message: format!(
                "Column '{}' already defined on table '{}' for {}",
                name, table, scope
            ),
            source: None,
        }
    }

    /// Create an invalid-name error
    pub fn invalid_name(name: &str) -> Self {
        Self {
            code: RegistryErrorCode::InvalidName,
            message: format!("Invalid column name '{}'", name),
            source: None,
        }
    }

    /// Create a missing-primary-key error
    pub fn missing_primary_key(table: &str) -> Self {
        Self {
            code: RegistryErrorCode::MissingPrimaryKey,
            message: format!("Record of table '{}' is missing primary-key properties", table),
            source: None,
        }
    }

    /// Create a malformed-definition error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            code: RegistryErrorCode::MalformedDefinition,
            message: format!("Malformed attribute definition: {}", reason.into()),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> RegistryErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<crate::backend::BackendError> for RegistryError {
    fn from(err: crate::backend::BackendError) -> Self {
        Self {
            code: RegistryErrorCode::Storage,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
