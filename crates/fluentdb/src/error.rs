//! Error types for fluentdb

use thiserror::Error;

/// Result type alias for fluentdb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for statement construction and execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Builder or connection state is unusable (no table, no columns, unknown connection)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the current state or for the statement kind
    #[error("Usage error: {0}")]
    Usage(String),

    /// Feature not implemented by the driver or the dialect
    #[error("Not implemented: {0}")]
    Unsupported(String),

    /// Error reported by the underlying connection
    #[error("Driver error{}: {message}", code_suffix(.code))]
    Driver {
        code: Option<String>,
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a driver error without a vendor code
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            code: None,
            message: message.into(),
        }
    }

    /// Create a driver error carrying the vendor's error code
    pub fn driver_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Check if this error came from the driver
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    /// Prefix the message with the statement or clause it came from.
    ///
    /// Driver errors are returned unchanged.
    pub fn context(self, ctx: &str) -> Self {
        match self {
            Self::Configuration(m) => Self::Configuration(format!("{ctx}: {m}")),
            Self::Usage(m) => Self::Usage(format!("{ctx}: {m}")),
            Self::Unsupported(m) => Self::Unsupported(format!("{ctx}: {m}")),
            Self::Serialization(m) => Self::Serialization(format!("{ctx}: {m}")),
            other => other,
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display_includes_code() {
        let err = DbError::driver_with_code("23000", "Duplicate entry");
        assert_eq!(err.to_string(), "Driver error [23000]: Duplicate entry");
        assert_eq!(DbError::driver("gone").to_string(), "Driver error: gone");
    }

    #[test]
    fn context_prefixes_builder_errors_only() {
        let err = DbError::usage("only one table allowed").context("INSERT");
        assert_eq!(err, DbError::Usage("INSERT: only one table allowed".into()));

        let err = DbError::driver("boom").context("INSERT");
        assert!(err.is_driver());
        assert_eq!(err.to_string(), "Driver error: boom");
    }
}
